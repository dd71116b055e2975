use crate::config::atomic_rename;
use crate::model::{Creature, CreatureRecord, Stone, StoneKind, StoneRecord, StonesRecord};
use anyhow::Result;
use std::{fs, path::Path};

/// Missing or malformed files are first-run defaults, never an error.
pub(crate) fn load_creature(path: &Path) -> Creature {
    let mut creature = Creature::new();
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(rec) = serde_json::from_str::<CreatureRecord>(&s) {
            creature.need = rec.need.clamp(0.0, 100.0);
            creature.last_visit_ms = Some(rec.last_visit);
            creature.total_visits = rec.total_visits;
        }
    }
    // This load counts as a visit.
    creature.total_visits += 1;
    creature
}

pub(crate) fn save_creature(path: &Path, creature: &Creature, now_ms: i64) -> Result<()> {
    let rec = CreatureRecord {
        need: creature.need,
        last_visit: now_ms,
        total_visits: creature.total_visits,
    };
    write_atomic(path, &serde_json::to_vec_pretty(&rec)?)
}

/// Unknown stone names (corrupt or future files) are dropped; an active
/// color that no longer matches a held stone is cleared.
pub(crate) fn load_stones(path: &Path) -> (Vec<Stone>, Option<[u8; 3]>) {
    let Ok(s) = fs::read_to_string(path) else {
        return (Vec::new(), None);
    };
    let Ok(rec) = serde_json::from_str::<StonesRecord>(&s) else {
        return (Vec::new(), None);
    };

    let inventory: Vec<Stone> = rec
        .inventory
        .iter()
        .filter_map(|r| {
            StoneKind::from_name(&r.name).map(|kind| Stone {
                kind,
                found_at_ms: r.found_at,
            })
        })
        .collect();

    let active = rec
        .active_color
        .filter(|c| inventory.iter().any(|s| s.kind.rgb() == *c));

    (inventory, active)
}

pub(crate) fn save_stones(
    path: &Path,
    inventory: &[Stone],
    active_color: Option<[u8; 3]>,
) -> Result<()> {
    let rec = StonesRecord {
        inventory: inventory
            .iter()
            .map(|s| StoneRecord {
                name: s.kind.name().to_string(),
                rgb: s.kind.rgb(),
                found_at: s.found_at_ms,
            })
            .collect(),
        active_color,
    };
    write_atomic(path, &serde_json::to_vec_pretty(&rec)?)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("weatherblob-tests");
        fs::create_dir_all(&dir).ok();
        dir.join(format!("{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_yields_first_run_defaults() {
        let c = load_creature(Path::new("/nonexistent/creature.json"));
        assert_eq!(c.need, 50.0);
        assert_eq!(c.total_visits, 1);
        assert!(c.last_visit_ms.is_none());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = scratch("garbage");
        fs::write(&path, b"{not json").unwrap();
        let c = load_creature(&path);
        assert_eq!(c.need, 50.0);
        assert_eq!(c.total_visits, 1);
        let (inv, active) = load_stones(&path);
        assert!(inv.is_empty());
        assert!(active.is_none());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn creature_round_trip_increments_visits() {
        let path = scratch("creature-rt");
        let mut c = Creature::new();
        c.need = 62.5;
        c.total_visits = 4;
        save_creature(&path, &c, 123_456).unwrap();

        let loaded = load_creature(&path);
        assert_eq!(loaded.need, 62.5);
        assert_eq!(loaded.total_visits, 5);
        assert_eq!(loaded.last_visit_ms, Some(123_456));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn creature_record_uses_original_field_names() {
        let path = scratch("creature-fields");
        save_creature(&path, &Creature::new(), 9).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"lastVisit\""));
        assert!(raw.contains("\"totalVisits\""));
        assert!(raw.contains("\"need\""));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn stones_round_trip_preserves_order_and_active() {
        let path = scratch("stones-rt");
        let inv = vec![
            Stone {
                kind: StoneKind::Pink,
                found_at_ms: 10,
            },
            Stone {
                kind: StoneKind::Blue,
                found_at_ms: 20,
            },
        ];
        save_stones(&path, &inv, Some(StoneKind::Blue.rgb())).unwrap();

        let (loaded, active) = load_stones(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].kind, StoneKind::Pink);
        assert_eq!(loaded[1].kind, StoneKind::Blue);
        assert_eq!(loaded[1].found_at_ms, 20);
        assert_eq!(active, Some(StoneKind::Blue.rgb()));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn active_color_without_matching_stone_is_cleared() {
        let path = scratch("stones-orphan-active");
        let inv = vec![Stone {
            kind: StoneKind::Green,
            found_at_ms: 1,
        }];
        save_stones(&path, &inv, Some(StoneKind::Gold.rgb())).unwrap();
        let (_, active) = load_stones(&path);
        assert!(active.is_none());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn unknown_stone_names_are_dropped() {
        let path = scratch("stones-unknown");
        fs::write(
            &path,
            r#"{"inventory":[{"name":"Opal Stone","rgb":[1,2,3],"foundAt":5},
                {"name":"Gold Stone","rgb":[255,215,100],"foundAt":6}],
                "activeColor":null}"#,
        )
        .unwrap();
        let (inv, _) = load_stones(&path);
        assert_eq!(inv.len(), 1);
        assert_eq!(inv[0].kind, StoneKind::Gold);
        fs::remove_file(&path).ok();
    }
}
