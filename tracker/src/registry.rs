//! Player roster addressable by any of four independent identifiers
//!
//! Updates about one player arrive keyed by whichever identifier the sender
//! knew: a spawn names the control and transform objects, a rename names the
//! control object, a roster sync names the player ordinal. The registry keeps
//! one record per player and an index from every known identifier to it, so
//! each update enriches the same record instead of creating a partial twin.
//!
//! Uniqueness is enforced by merging: when an assignment would give a second
//! record an identifier another record already holds, the two are folded
//! together. Values already present on the surviving record win.

use crate::transport::RemoteClient;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Empty until known.
    pub name: String,
    pub client_id: Option<u32>,
    pub player_id: Option<u8>,
    pub control_net_id: Option<u32>,
    pub transform_net_id: Option<u32>,
}

impl PlayerRecord {
    fn keys(&self) -> Vec<IdKey> {
        [
            self.client_id.map(IdKey::Client),
            self.player_id.map(IdKey::Player),
            self.control_net_id.map(IdKey::Control),
            self.transform_net_id.map(IdKey::Transform),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn get(&self, field: IdField) -> Option<IdKey> {
        match field {
            IdField::Client => self.client_id.map(IdKey::Client),
            IdField::Player => self.player_id.map(IdKey::Player),
            IdField::Control => self.control_net_id.map(IdKey::Control),
            IdField::Transform => self.transform_net_id.map(IdKey::Transform),
        }
    }

    fn set(&mut self, key: IdKey) {
        match key {
            IdKey::Client(id) => self.client_id = Some(id),
            IdKey::Player(id) => self.player_id = Some(id),
            IdKey::Control(id) => self.control_net_id = Some(id),
            IdKey::Transform(id) => self.transform_net_id = Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdField {
    Client,
    Player,
    Control,
    Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdKey {
    Client(u32),
    Player(u8),
    Control(u32),
    Transform(u32),
}

impl IdKey {
    fn field(self) -> IdField {
        match self {
            IdKey::Client(_) => IdField::Client,
            IdKey::Player(_) => IdField::Player,
            IdKey::Control(_) => IdField::Control,
            IdKey::Transform(_) => IdField::Transform,
        }
    }
}

type Handle = u64;

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    records: HashMap<Handle, PlayerRecord>,
    index: HashMap<IdKey, Handle>,
    next_handle: Handle,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.values()
    }

    pub fn find_by_client_id(&self, id: u32) -> Option<&PlayerRecord> {
        self.find(IdKey::Client(id))
    }

    pub fn find_by_player_id(&self, id: u8) -> Option<&PlayerRecord> {
        self.find(IdKey::Player(id))
    }

    pub fn find_by_control_net_id(&self, id: u32) -> Option<&PlayerRecord> {
        self.find(IdKey::Control(id))
    }

    pub fn find_by_transform_net_id(&self, id: u32) -> Option<&PlayerRecord> {
        self.find(IdKey::Transform(id))
    }

    fn find(&self, key: IdKey) -> Option<&PlayerRecord> {
        self.index
            .get(&key)
            .and_then(|handle| self.records.get(handle))
    }

    /// Records a spawned player object. The name is left untouched.
    pub fn upsert_by_spawn(
        &mut self,
        control_net_id: u32,
        transform_net_id: u32,
        owner_client_id: u32,
        player_id: u8,
    ) {
        let handle = self.find_or_insert(IdKey::Control(control_net_id));
        self.assign(handle, IdKey::Client(owner_client_id));
        self.assign(handle, IdKey::Player(player_id));
        self.assign(handle, IdKey::Transform(transform_net_id));
    }

    pub fn upsert_by_name(&mut self, control_net_id: u32, name: &str) {
        let handle = self.find_or_insert(IdKey::Control(control_net_id));
        self.set_name(handle, name);
    }

    pub fn upsert_by_player_id(&mut self, player_id: u8, name: &str) {
        let handle = self.find_or_insert(IdKey::Player(player_id));
        self.set_name(handle, name);
    }

    /// Loads the transport's roster, upserting every identifier it knows per client.
    pub fn bulk_load(&mut self, clients: &[RemoteClient]) {
        for client in clients {
            let primary = client
                .control_net_id
                .map(IdKey::Control)
                .or(client.player_id.map(IdKey::Player))
                .unwrap_or(IdKey::Client(client.id));
            let handle = self.find_or_insert(primary);

            self.assign(handle, IdKey::Client(client.id));
            if let Some(id) = client.player_id {
                self.assign(handle, IdKey::Player(id));
            }
            if let Some(id) = client.control_net_id {
                self.assign(handle, IdKey::Control(id));
            }
            if let Some(id) = client.transform_net_id {
                self.assign(handle, IdKey::Transform(id));
            }
            if !client.name.is_empty() {
                self.set_name(handle, &client.name);
            }
        }
        debug!("Bulk loaded {} clients, {} records", clients.len(), self.len());
    }

    pub fn remove(&mut self, client_id: u32) -> Option<PlayerRecord> {
        let handle = self.index.get(&IdKey::Client(client_id)).copied()?;
        self.take(handle)
    }

    pub fn reset_all(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    fn find_or_insert(&mut self, key: IdKey) -> Handle {
        if let Some(&handle) = self.index.get(&key) {
            return handle;
        }

        let handle = self.next_handle;
        self.next_handle += 1;

        let mut record = PlayerRecord::default();
        record.set(key);
        self.records.insert(handle, record);
        self.index.insert(key, handle);
        handle
    }

    fn set_name(&mut self, handle: Handle, name: &str) {
        if let Some(record) = self.records.get_mut(&handle) {
            record.name = name.to_string();
        }
    }

    fn take(&mut self, handle: Handle) -> Option<PlayerRecord> {
        let record = self.records.remove(&handle)?;
        for key in record.keys() {
            self.index.remove(&key);
        }
        Some(record)
    }

    /// Gives `key` to the record at `handle`, merging any other holder into it.
    fn assign(&mut self, handle: Handle, key: IdKey) {
        let Some(previous) = self.records.get(&handle).map(|r| r.get(key.field())) else {
            return;
        };
        if previous == Some(key) {
            return;
        }

        if let Some(&other) = self.index.get(&key) {
            if other != handle {
                self.merge(handle, other);
            }
        }

        // Merging may have filled this field from the other record.
        let Some(record) = self.records.get_mut(&handle) else {
            return;
        };
        if let Some(old) = record.get(key.field()) {
            self.index.remove(&old);
        }
        record.set(key);
        self.index.insert(key, handle);
    }

    /// Folds the record at `from` into the one at `into`.
    fn merge(&mut self, into: Handle, from: Handle) {
        let Some(absorbed) = self.take(from) else {
            return;
        };
        let Some(record) = self.records.get_mut(&into) else {
            return;
        };
        debug!("Merging player record {:?} into {:?}", absorbed, record);

        if record.name.is_empty() {
            record.name = absorbed.name.clone();
        }
        for key in absorbed.keys() {
            if record.get(key.field()).is_none() {
                record.set(key);
                self.index.insert(key, into);
            }
        }
    }
}
