//! The rendering surface as seen by the core.
//!
//! Four capabilities only: create a node, fade it (awaitable), set its
//! geometry, remove it. How a node is drawn is the renderer's business.

use crate::types::{ActionKind, Properties};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The series line itself.
    Trace,
    Dot,
    Circle,
    TextBox,
    Connector,
}

impl NodeKind {
    pub fn for_action(kind: ActionKind) -> Option<NodeKind> {
        match kind {
            ActionKind::Dot => Some(NodeKind::Dot),
            ActionKind::Circle => Some(NodeKind::Circle),
            ActionKind::TextBox => Some(NodeKind::TextBox),
            ActionKind::Connector => Some(NodeKind::Connector),
            ActionKind::Pause => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Everything a renderer needs to place a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Coord>,
    #[serde(default)]
    pub attributes: Properties,
}

pub trait Canvas: Send + Sync {
    fn create_node(&self, kind: NodeKind) -> NodeId;

    /// Fades `node` to `value`; the future completes once the transition has
    /// finished.
    fn set_opacity(
        &self,
        node: NodeId,
        value: f64,
        duration: Duration,
        delay: Duration,
    ) -> BoxFuture<'static, ()>;

    fn set_geometry(&self, node: NodeId, geometry: &Geometry);

    fn remove_node(&self, node: NodeId);
}

// ---------------------------------------------------------------------------
// TracingCanvas
// ---------------------------------------------------------------------------

/// Headless canvas that logs every call and keeps transition timing with
/// `tokio::time::sleep`.
#[derive(Debug, Default)]
pub struct TracingCanvas {
    name: String,
    next_id: AtomicU64,
}

impl TracingCanvas {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn nodes_created(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl Canvas for TracingCanvas {
    fn create_node(&self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::debug!(canvas = %self.name, node = %id, ?kind, "create node");
        id
    }

    fn set_opacity(
        &self,
        node: NodeId,
        value: f64,
        duration: Duration,
        delay: Duration,
    ) -> BoxFuture<'static, ()> {
        tracing::info!(
            canvas = %self.name,
            node = %node,
            opacity = value,
            delay_ms = delay.as_millis() as u64,
            duration_ms = duration.as_millis() as u64,
            "fade"
        );
        Box::pin(tokio::time::sleep(delay + duration))
    }

    fn set_geometry(&self, node: NodeId, geometry: &Geometry) {
        tracing::debug!(canvas = %self.name, node = %node, origin = ?geometry.origin, destination = ?geometry.destination, "geometry");
    }

    fn remove_node(&self, node: NodeId) {
        tracing::debug!(canvas = %self.name, node = %node, "remove node");
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Created(NodeId, NodeKind),
        FadeStarted(NodeId, f64),
        FadeFinished(NodeId, f64),
        Geometry(NodeId, Geometry),
        Removed(NodeId),
    }

    /// Canvas that records calls in order. Fades sleep for `delay + duration`
    /// so tests can observe concurrency under paused tokio time.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingCanvas {
        events: Arc<Mutex<Vec<Event>>>,
        next_id: Arc<AtomicU64>,
    }

    impl RecordingCanvas {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, e: Event) {
            self.events.lock().unwrap().push(e);
        }

        pub fn kinds_created(&self) -> Vec<NodeKind> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Created(_, k) => Some(k),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn create_node(&self, kind: NodeKind) -> NodeId {
            let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.push(Event::Created(id, kind));
            id
        }

        fn set_opacity(
            &self,
            node: NodeId,
            value: f64,
            duration: Duration,
            delay: Duration,
        ) -> BoxFuture<'static, ()> {
            self.push(Event::FadeStarted(node, value));
            let events = self.events.clone();
            Box::pin(async move {
                tokio::time::sleep(delay + duration).await;
                events.lock().unwrap().push(Event::FadeFinished(node, value));
            })
        }

        fn set_geometry(&self, node: NodeId, geometry: &Geometry) {
            self.push(Event::Geometry(node, geometry.clone()));
        }

        fn remove_node(&self, node: NodeId) {
            self.push(Event::Removed(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_has_no_node_kind() {
        assert_eq!(NodeKind::for_action(ActionKind::Pause), None);
        assert_eq!(
            NodeKind::for_action(ActionKind::TextBox),
            Some(NodeKind::TextBox)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tracing_canvas_waits_for_transition() {
        let canvas = TracingCanvas::new("main");
        let node = canvas.create_node(NodeKind::Dot);
        let start = tokio::time::Instant::now();
        canvas
            .set_opacity(node, 1.0, Duration::from_millis(300), Duration::from_millis(200))
            .await;
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(canvas.nodes_created(), 1);
    }
}
