use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use mamba_common::Hospital;

/// Read access to the hospital registry. The registry itself is owned
/// elsewhere; dispatch only ever reads it.
#[async_trait]
pub trait HospitalDirectory: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Hospital>>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Hospital>>;
}

/// In-memory directory, loaded from a seed file at startup and usable as
/// a test fixture.
#[derive(Default)]
pub struct MemoryDirectory {
    hospitals: DashMap<Uuid, Hospital>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, hospital: Hospital) {
        self.hospitals.insert(hospital.id, hospital);
    }

    /// Load hospital records from a JSON array on disk.
    pub fn from_seed_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let hospitals: Vec<Hospital> = serde_json::from_str(&raw)?;
        let dir = Self::new();
        let count = hospitals.len();
        for hospital in hospitals {
            dir.upsert(hospital);
        }
        tracing::info!(count, path, "Hospital directory seeded");
        Ok(dir)
    }

    pub fn len(&self) -> usize {
        self.hospitals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty()
    }
}

#[async_trait]
impl HospitalDirectory for MemoryDirectory {
    async fn list(&self) -> anyhow::Result<Vec<Hospital>> {
        Ok(self.hospitals.iter().map(|e| e.value().clone()).collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Hospital>> {
        Ok(self.hospitals.get(&id).map(|e| e.value().clone()))
    }
}
