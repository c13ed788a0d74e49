use fxhash::FxHashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::objects::{Host, LogConfig, LogEntry, ProgramStatus, Service, ServiceConfig};

/// Serialized form of the core's configuration and state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub program: ProgramStatus,
    pub hosts: Vec<Host>,
    pub services: Vec<ServiceConfig>,
    pub log: Vec<LogConfig>,
}

/// The live objects of the monitoring core
#[derive(Debug, Default)]
pub struct ObjectGraph {
    pub program: ProgramStatus,
    pub hosts: Vec<Arc<Host>>,
    pub services: Vec<Arc<Service>>,
    pub log: Vec<LogEntry>,
}

impl ObjectGraph {
    /// Link services and log entries to their hosts
    pub fn build(snapshot: Snapshot) -> Result<Self, CoreError> {
        let mut hosts = snapshot.hosts;

        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        for (i, host) in hosts.iter().enumerate() {
            if index.insert(host.name.clone(), i).is_some() {
                return Err(CoreError::DuplicateHost(host.name.clone()));
            }
        }

        for service in &snapshot.services {
            let &i = index
                .get(&service.host_name)
                .ok_or_else(|| CoreError::UnknownHost {
                    host: service.host_name.clone(),
                    service: service.description.clone(),
                })?;
            hosts[i].services.push(service.description.clone());
        }

        let hosts: Vec<Arc<Host>> = hosts.into_iter().map(Arc::new).collect();

        let services = snapshot
            .services
            .into_iter()
            .map(|service| {
                let host = Arc::clone(&hosts[index[&service.host_name]]);
                Arc::new(service.attach(host))
            })
            .collect();

        // Log entries may outlive the hosts they mention
        let log = snapshot
            .log
            .into_iter()
            .map(|entry| {
                let host = index.get(&entry.host_name).map(|&i| Arc::clone(&hosts[i]));
                entry.attach(host)
            })
            .collect();

        Ok(Self {
            program: snapshot.program,
            hosts,
            services,
            log,
        })
    }

    pub fn find_host(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.iter().find(|h| h.name == name)
    }
}

/// Owner of the object graph. Readers hold a [`CoreGuard`] for the duration
/// of one table iteration; configuration reloads take the write side.
#[derive(Debug, Default)]
pub struct Core {
    graph: RwLock<ObjectGraph>,
    generation: AtomicU64,
}

impl Core {
    pub fn new(graph: ObjectGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, CoreError> {
        Ok(Self::new(ObjectGraph::build(snapshot)?))
    }

    /// Load a JSON snapshot from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        Self::from_snapshot(snapshot)
    }

    /// Acquire the read side. Rows borrowed from the guard cannot outlive it.
    pub fn read(&self) -> CoreGuard<'_> {
        let guard = self.graph.read();
        CoreGuard {
            generation: self.generation.load(Ordering::Acquire),
            graph: guard,
        }
    }

    /// Replace the whole object graph, invalidating everything derived from the old one
    pub fn reload(&self, snapshot: Snapshot) -> Result<u64, CoreError> {
        let graph = ObjectGraph::build(snapshot)?;
        let mut current = self.graph.write();
        *current = graph;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "core configuration reloaded");
        Ok(generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Scoped read access to the object graph
pub struct CoreGuard<'a> {
    graph: RwLockReadGuard<'a, ObjectGraph>,
    generation: u64,
}

impl<'a> CoreGuard<'a> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }
}

impl std::ops::Deref for CoreGuard<'_> {
    type Target = ObjectGraph;

    fn deref(&self) -> &ObjectGraph {
        &self.graph
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Host '{0}' defined more than once")]
    DuplicateHost(String),

    #[error("Service '{service}' refers to unknown host '{host}'")]
    UnknownHost { host: String, service: String },
}
