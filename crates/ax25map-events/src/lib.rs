use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod scheduler;

pub use scheduler::{Scheduler, TaskClass, Ticket};

/// Which placement algorithm a layout run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    #[default]
    ForceDirected,
    Spring,
    Hub,
}

impl LayoutAlgorithm {
    pub const ALL: [LayoutAlgorithm; 3] = [Self::ForceDirected, Self::Spring, Self::Hub];

    pub fn name(self) -> &'static str {
        match self {
            Self::ForceDirected => "force-directed",
            Self::Spring => "spring",
            Self::Hub => "hub",
        }
    }
}

impl fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "force-directed" | "force" | "fr" => Ok(Self::ForceDirected),
            "spring" | "sfdp" => Ok(Self::Spring),
            "hub" | "straight" | "straight-line" => Ok(Self::Hub),
            other => Err(format!("unknown layout algorithm: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Topology
    TopologyChanged {
        total_nodes: usize,
        total_edges: usize,
        hearable_count: usize,
    },
    RefreshFailed {
        error: String,
    },

    // Layout
    LayoutCompleted {
        algorithm: LayoutAlgorithm,
        grade: char,
        score: f32,
    },
    /// A run finished against a topology that changed underneath it.
    LayoutDiscarded {
        algorithm: LayoutAlgorithm,
    },
    AnchorsRecomputed {
        edge_count: usize,
    },
    LayoutSaved {
        algorithm: LayoutAlgorithm,
        node_count: usize,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, "Publishing event");
        let _ = self.tx.send(event);
    }

    /// Drain everything queued so far without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }

    /// Dispatch all pending events to a listener.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
