//! CRUD over user presets with synchronous persistence.

use uuid::Uuid;

use super::persistence::KeyValueStore;
use super::preset::Preset;
use crate::error::StoreError;
use crate::types::ConversionForm;

const PRESETS_KEY: &str = "user_presets";
const AUTO_APPLY_KEY: &str = "auto_apply_first_preset";

/// User-defined presets, persisted on every mutation.
///
/// Unknown ids make `update`/`delete` no-ops that return `Ok(false)`.
/// Names need not be unique.
pub struct PresetStore {
    presets: Vec<Preset>,
    auto_apply: bool,
    storage: Box<dyn KeyValueStore>,
}

impl PresetStore {
    /// Load presets and the auto-apply flag from `storage`.
    ///
    /// Missing or malformed data yields an empty list.
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let presets = match storage.read_blob(PRESETS_KEY) {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable saved presets: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let auto_apply = storage.read_bool(AUTO_APPLY_KEY);
        tracing::debug!("Loaded {} preset(s), auto-apply {}", presets.len(), auto_apply);

        Self {
            presets,
            auto_apply,
            storage,
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, id: Uuid) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Append a preset built from `form`. Returns its id.
    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        icon: &str,
        form: &ConversionForm,
    ) -> Result<Uuid, StoreError> {
        let preset = Preset::from_form(name, description, icon, form);
        let id = preset.id;
        self.presets.push(preset);
        self.save()?;
        Ok(id)
    }

    /// Replace the preset with `id`, keeping its id and position.
    pub fn update(
        &mut self,
        id: Uuid,
        name: &str,
        description: &str,
        icon: &str,
        form: &ConversionForm,
    ) -> Result<bool, StoreError> {
        let Some(slot) = self.presets.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        *slot = Preset::with_id(id, name, description, icon, form);
        self.save()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.delete_many(&[id])? > 0)
    }

    /// Delete every preset whose id is in `ids`. Returns how many were removed.
    pub fn delete_many(&mut self, ids: &[Uuid]) -> Result<usize, StoreError> {
        let before = self.presets.len();
        self.presets.retain(|p| !ids.contains(&p.id));
        let removed = before - self.presets.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// Move the presets at `from` so they land before the preset currently
    /// at `to`. `to == len` moves them to the end.
    ///
    /// Indices are positions in the list before the move; out-of-range
    /// indices are ignored and moved presets keep their relative order.
    pub fn reorder(&mut self, from: &[usize], to: usize) -> Result<(), StoreError> {
        let len = self.presets.len();
        let mut indices: Vec<usize> = from.iter().copied().filter(|&i| i < len).collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Ok(());
        }

        let to = to.min(len);
        let shifted = indices.iter().filter(|&&i| i < to).count();
        let mut moved: Vec<Preset> = indices
            .iter()
            .rev()
            .map(|&i| self.presets.remove(i))
            .collect();
        moved.reverse();

        let insert_at = to - shifted;
        self.presets.splice(insert_at..insert_at, moved);
        self.save()
    }

    pub fn auto_apply(&self) -> bool {
        self.auto_apply
    }

    pub fn set_auto_apply(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.auto_apply = enabled;
        self.storage.write_bool(AUTO_APPLY_KEY, enabled)
    }

    /// The first preset's form when auto-apply is on and a preset exists.
    pub fn auto_apply_form(&self, output_directory: &str) -> Option<ConversionForm> {
        if !self.auto_apply {
            return None;
        }
        self.presets.first().map(|p| p.make_form(output_directory))
    }

    fn save(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(&self.presets)?;
        self.storage.write_blob(PRESETS_KEY, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::persistence::{FileStore, MemoryStore};
    use crate::types::TargetFormat;

    fn form(quality: f64, resize_percent: f64) -> ConversionForm {
        ConversionForm {
            quality,
            resize_percent,
            ..ConversionForm::default()
        }
    }

    fn names(store: &PresetStore) -> Vec<&str> {
        store.presets().iter().map(|p| p.name.as_str()).collect()
    }

    fn store_with(names: &[&str]) -> PresetStore {
        let mut store = PresetStore::load(Box::new(MemoryStore::new()));
        for name in names {
            store.create(name, "", "star", &form(75.0, 100.0)).unwrap();
        }
        store
    }

    #[test]
    fn test_create_apply_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PresetStore::load(Box::new(FileStore::new(dir.path())));
        let id = store
            .create("Half size", "For email", "envelope", &form(80.0, 50.0))
            .unwrap();

        let applied = store.get(id).unwrap().make_form("~/out");
        assert_eq!(applied.quality, 80.0);
        assert_eq!(applied.resize_percent, 50.0);

        let reloaded = PresetStore::load(Box::new(FileStore::new(dir.path())));
        assert_eq!(reloaded.presets(), store.presets());
    }

    #[test]
    fn test_update_keeps_id_and_position() {
        let mut store = store_with(&["A", "B"]);
        let id = store.presets()[0].id;
        let mut webp = form(60.0, 100.0);
        webp.format = TargetFormat::WebP;

        assert!(store.update(id, "A2", "new", "bolt", &webp).unwrap());
        assert_eq!(names(&store), vec!["A2", "B"]);
        assert_eq!(store.presets()[0].id, id);
        assert_eq!(store.presets()[0].format, TargetFormat::WebP);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut store = store_with(&["A"]);
        let before = store.presets().to_vec();

        assert!(!store.update(Uuid::new_v4(), "X", "", "", &form(1.0, 1.0)).unwrap());
        assert!(!store.delete(Uuid::new_v4()).unwrap());
        assert_eq!(store.presets(), before.as_slice());
    }

    #[test]
    fn test_delete_many() {
        let mut store = store_with(&["A", "B", "C"]);
        let ids = [store.presets()[0].id, store.presets()[2].id, Uuid::new_v4()];

        assert_eq!(store.delete_many(&ids).unwrap(), 2);
        assert_eq!(names(&store), vec!["B"]);
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let store = store_with(&["Same", "Same"]);
        assert_eq!(store.presets().len(), 2);
        assert_ne!(store.presets()[0].id, store.presets()[1].id);
    }

    #[test]
    fn test_reorder_moves_down_and_up() {
        let mut store = store_with(&["A", "B", "C", "D"]);
        store.reorder(&[0], 3).unwrap();
        assert_eq!(names(&store), vec!["B", "C", "A", "D"]);

        store.reorder(&[3], 0).unwrap();
        assert_eq!(names(&store), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn test_reorder_multiple_to_end() {
        let mut store = store_with(&["A", "B", "C", "D"]);
        store.reorder(&[0, 2], 4).unwrap();
        assert_eq!(names(&store), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_reorder_ignores_out_of_range() {
        let mut store = store_with(&["A", "B"]);
        store.reorder(&[7], 0).unwrap();
        assert_eq!(names(&store), vec!["A", "B"]);
        store.reorder(&[0], 99).unwrap();
        assert_eq!(names(&store), vec!["B", "A"]);
    }

    #[test]
    fn test_reorder_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PresetStore::load(Box::new(FileStore::new(dir.path())));
        store.create("A", "", "", &form(75.0, 100.0)).unwrap();
        store.create("B", "", "", &form(75.0, 100.0)).unwrap();
        store.reorder(&[1], 0).unwrap();

        let reloaded = PresetStore::load(Box::new(FileStore::new(dir.path())));
        assert_eq!(names(&reloaded), vec!["B", "A"]);
    }

    #[test]
    fn test_auto_apply_flag_and_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PresetStore::load(Box::new(FileStore::new(dir.path())));
        assert!(!store.auto_apply());
        assert!(store.auto_apply_form("~/out").is_none());

        store.set_auto_apply(true).unwrap();
        assert!(store.auto_apply_form("~/out").is_none());

        store.create("First", "", "", &form(55.0, 100.0)).unwrap();
        assert_eq!(store.auto_apply_form("~/out").unwrap().quality, 55.0);

        let reloaded = PresetStore::load(Box::new(FileStore::new(dir.path())));
        assert!(reloaded.auto_apply());
    }

    #[test]
    fn test_malformed_data_loads_empty() {
        let storage = MemoryStore::new();
        storage.write_blob(PRESETS_KEY, b"{not json").unwrap();

        let store = PresetStore::load(Box::new(storage));
        assert!(store.presets().is_empty());
    }
}
