// -- config.rs --

use {
    crate::coordinator::Strategy,
    log::{info, warn},
    std::{
        fs::File,
        io::{Read, Write},
        path::Path,
    },
};

// --

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub actors: usize,
    pub strategy: Strategy,
    pub max_think_ms: u64,
    pub max_eat_ms: u64,
    /// Delay between the first and second fork, ordered strategy only.
    pub interlock_ms: u64,
    /// Meals per actor; `None` runs until stopped.
    pub rounds: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            actors: 5,
            strategy: Strategy::Fair,
            max_think_ms: 50,
            max_eat_ms: 50,
            interlock_ms: 0,
            rounds: Some(20),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: usize,
    pub capacity: usize,
    /// A producer waits until its previous item was consumed.
    pub await_each: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producers: 1,
            consumers: 1,
            items_per_producer: 1,
            capacity: 1,
            await_each: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn load(file_name: impl AsRef<Path>) -> Self {
        let mut json_str = String::new();
        let json_str = match File::open(file_name.as_ref()) {
            Ok(mut file) => {
                if let Err(e) = file.read_to_string(&mut json_str) {
                    warn!("{}", e.to_string());
                }
                json_str
            }
            Err(e) => {
                warn!("{}: {}", file_name.as_ref().display(), e.to_string());
                json_str
            }
        };
        match serde_json::from_str(&json_str) {
            Ok(v) => v,
            Err(e) => {
                warn!("{}", e.to_string());
                info!("use default configuration");
                Self::default()
            }
        }
    }
    pub fn store(&self, file_name: impl AsRef<Path>) {
        let json_str = match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                warn!("{}", e.to_string());
                return;
            }
        };
        match File::create(file_name.as_ref()) {
            Ok(mut f) => {
                if let Err(e) = f.write_all(json_str.as_bytes()) {
                    warn!("{}", e.to_string());
                }
            }
            Err(e) => {
                warn!("{}", e.to_string());
            }
        };
    }
}

// --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_test1() {
        init_test_log!();
        let fname = std::env::temp_dir().join(format!("refectory-{}.json", std::process::id()));
        let mut c = Config::default();
        c.table.strategy = Strategy::Ordered;
        c.table.rounds = None;
        c.pipeline.capacity = 3;
        c.store(&fname);
        let c2 = Config::load(&fname);
        let _ = std::fs::remove_file(&fname);
        assert_eq!(c, c2);
    }

    #[test]
    fn config_falls_back_to_defaults() {
        init_test_log!();
        let c = Config::load("/nonexistent/refectory.json");
        assert_eq!(Config::default(), c);
    }

    #[test]
    fn config_fills_missing_fields() {
        let c: Config = serde_json::from_str(r#"{"table": {"actors": 7, "strategy": "predicate"}}"#).unwrap();
        assert_eq!(7, c.table.actors);
        assert_eq!(Strategy::Predicate, c.table.strategy);
        assert_eq!(TableConfig::default().max_eat_ms, c.table.max_eat_ms);
        assert_eq!(PipelineConfig::default(), c.pipeline);
    }
}
