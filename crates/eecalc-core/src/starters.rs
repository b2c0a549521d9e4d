//! Named starter sheets bundled with the binary.

use crate::error::{EecalcError, Result};
use crate::protocol::Snapshot;

pub struct Starter {
    pub name: &'static str,
    source: &'static str,
}

pub const STARTERS: &[Starter] = &[
    Starter {
        name: "ohms-law",
        source: include_str!("../starters/ohms-law.json"),
    },
    Starter {
        name: "voltage-divider",
        source: include_str!("../starters/voltage-divider.json"),
    },
    Starter {
        name: "rc-filter",
        source: include_str!("../starters/rc-filter.json"),
    },
    Starter {
        name: "parallel-resistors",
        source: include_str!("../starters/parallel-resistors.json"),
    },
    Starter {
        name: "led-resistor",
        source: include_str!("../starters/led-resistor.json"),
    },
];

impl Starter {
    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::from_json(self.source)
    }
}

pub fn starter_names() -> impl Iterator<Item = &'static str> {
    STARTERS.iter().map(|s| s.name)
}

/// Look up a bundled starter by name.
pub fn load_starter(name: &str) -> Result<Snapshot> {
    STARTERS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| EecalcError::UnknownStarter(name.to_string()))?
        .snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_every_starter_parses_and_evaluates_cleanly() {
        for name in starter_names() {
            let snapshot = load_starter(name).unwrap();
            assert!(snapshot.title.is_some(), "{name} has no title");
            let mut doc = Document::new();
            doc.cells.full_replace(&snapshot.cells);
            doc.recalculate_all();
            for (i, result) in doc.results().iter().enumerate() {
                assert!(!result.is_error(), "{name} cell {i}: {:?}", result);
            }
        }
    }

    #[test]
    fn test_parallel_starter_value() {
        let snapshot = load_starter("parallel-resistors").unwrap();
        let mut doc = Document::new();
        doc.cells.full_replace(&snapshot.cells);
        doc.recalculate_all();
        let rp = doc.results()[3].as_number().unwrap();
        let expected = 1.0 / (1.0 / 1000.0 + 1.0 / 2200.0 + 1.0 / 4700.0);
        assert!((rp - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_starter() {
        assert!(matches!(
            load_starter("flux-capacitor"),
            Err(EecalcError::UnknownStarter(_))
        ));
    }
}
