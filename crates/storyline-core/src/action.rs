//! Visual actions and their lifecycle.
//!
//! ```text
//! Created ──show──▶ Shown ──hide──▶ Hidden
//!                    ▲ │ move         │
//!                    └─┴──── show ◀───┘
//! ```
//!
//! [`Mark`] is a single visual element; [`Group`] is an ordered composite of
//! actions with no geometry of its own. Both implement [`Animate`], and
//! [`Action`] dispatches between them.

use crate::canvas::{Canvas, Coord, Geometry, NodeId, NodeKind};
use crate::error::{Result, StoryError};
use crate::table::ActionSpec;
use crate::types::{ActionKind, FeatureKind, Properties};
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Shown,
    Hidden,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Created => "created",
            Lifecycle::Shown => "shown",
            Lifecycle::Hidden => "hidden",
        };
        f.write_str(s)
    }
}

/// Resolved value of a transition: how long it took, delay included.
pub type Elapsed = Duration;

// ---------------------------------------------------------------------------
// Animate
// ---------------------------------------------------------------------------

pub trait Animate {
    /// Creates the visual node at opacity 0. At most once per instance.
    fn attach(&mut self, canvas: Arc<dyn Canvas>) -> Result<()>;

    fn set_props(&mut self, props: Properties);

    /// Merges `patch` into the current properties.
    fn update_props(&mut self, patch: &Properties);

    /// Geometry only; never changes the lifecycle state.
    fn set_coordinate(&mut self, origin: Coord, destination: Option<Coord>);

    fn show(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>>;

    fn hide(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>>;

    /// Fails synchronously with `UnsupportedOperation` for variants that
    /// cannot move.
    fn move_to(
        &mut self,
        destination: Coord,
        delay: Duration,
        duration: Duration,
    ) -> Result<BoxFuture<'_, Result<Elapsed>>>;

    /// Removes the node from its canvas, if any.
    fn detach(&mut self);
}

// ---------------------------------------------------------------------------
// Mark
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize)]
pub struct Mark {
    kind: ActionKind,
    props: Properties,
    lifecycle: Lifecycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<Coord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<Coord>,
    #[serde(skip)]
    canvas: Option<Arc<dyn Canvas>>,
    #[serde(skip)]
    node: Option<NodeId>,
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mark")
            .field("kind", &self.kind)
            .field("lifecycle", &self.lifecycle)
            .field("node", &self.node)
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("props", &self.props)
            .finish()
    }
}

impl Mark {
    pub fn new(kind: ActionKind, props: Properties) -> Self {
        Self {
            kind,
            props,
            lifecycle: Lifecycle::Created,
            origin: None,
            destination: None,
            canvas: None,
            node: None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn origin(&self) -> Option<Coord> {
        self.origin
    }

    pub fn destination(&self) -> Option<Coord> {
        self.destination
    }

    pub fn is_attached(&self) -> bool {
        self.canvas.is_some()
    }

    /// `hide: false` keeps the mark on screen once shown.
    pub fn hides(&self) -> bool {
        !matches!(self.props.get("hide"), Some(Value::Bool(false)))
    }

    fn millis_prop(&self, key: &str) -> Option<Duration> {
        self.props.get(key).and_then(Value::as_u64).map(Duration::from_millis)
    }

    /// Per-mark `delay_ms` / `duration_ms` override the caller's timing.
    fn timing(&self, delay: Duration, duration: Duration) -> (Duration, Duration) {
        (
            self.millis_prop("delay_ms").unwrap_or(delay),
            self.millis_prop("duration_ms").unwrap_or(duration),
        )
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            origin: self.origin,
            destination: self.destination,
            attributes: self.props.clone(),
        }
    }

    fn sync(&self) {
        if let (Some(canvas), Some(node)) = (&self.canvas, self.node) {
            canvas.set_geometry(node, &self.geometry());
        }
    }

    fn require_attached(&self) -> Result<()> {
        if self.canvas.is_none() {
            return Err(StoryError::NotAttached(self.kind.to_string()));
        }
        Ok(())
    }

    fn invalid(&self, op: &'static str) -> StoryError {
        StoryError::InvalidTransition {
            from: self.lifecycle.to_string(),
            op,
        }
    }

    async fn fade(&self, value: f64, delay: Duration, duration: Duration) {
        if let (Some(canvas), Some(node)) = (&self.canvas, self.node) {
            canvas.set_opacity(node, value, duration, delay).await;
        }
    }
}

impl Animate for Mark {
    fn attach(&mut self, canvas: Arc<dyn Canvas>) -> Result<()> {
        if self.canvas.is_some() {
            return Err(StoryError::AlreadyAttached(self.kind.to_string()));
        }
        if let Some(kind) = NodeKind::for_action(self.kind) {
            let node = canvas.create_node(kind);
            let mut geometry = self.geometry();
            geometry.attributes.insert("opacity".into(), Value::from(0.0));
            canvas.set_geometry(node, &geometry);
            self.node = Some(node);
        }
        self.canvas = Some(canvas);
        self.lifecycle = Lifecycle::Created;
        Ok(())
    }

    fn set_props(&mut self, props: Properties) {
        self.props = props;
        self.sync();
    }

    fn update_props(&mut self, patch: &Properties) {
        for (k, v) in patch {
            self.props.insert(k.clone(), v.clone());
        }
        self.sync();
    }

    fn set_coordinate(&mut self, origin: Coord, destination: Option<Coord>) {
        self.origin = Some(origin);
        self.destination = destination;
        self.sync();
    }

    fn show(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        Box::pin(async move {
            self.require_attached()?;
            if self.lifecycle == Lifecycle::Shown {
                return Err(self.invalid("show"));
            }
            if self.kind == ActionKind::Pause {
                self.lifecycle = Lifecycle::Shown;
                return Ok(Duration::ZERO);
            }
            let (delay, duration) = self.timing(delay, duration);
            self.fade(1.0, delay, duration).await;
            self.lifecycle = Lifecycle::Shown;
            Ok(delay + duration)
        })
    }

    fn hide(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        Box::pin(async move {
            if !self.hides() {
                return Ok(Duration::ZERO);
            }
            self.require_attached()?;
            if self.lifecycle != Lifecycle::Shown {
                return Err(self.invalid("hide"));
            }
            if self.kind == ActionKind::Pause {
                self.lifecycle = Lifecycle::Hidden;
                return Ok(Duration::ZERO);
            }
            let (delay, duration) = self.timing(delay, duration);
            self.fade(0.0, delay, duration).await;
            self.lifecycle = Lifecycle::Hidden;
            Ok(delay + duration)
        })
    }

    fn move_to(
        &mut self,
        destination: Coord,
        delay: Duration,
        duration: Duration,
    ) -> Result<BoxFuture<'_, Result<Elapsed>>> {
        if !self.kind.supports_move() {
            return Err(StoryError::UnsupportedOperation {
                kind: self.kind.to_string(),
                op: "move",
            });
        }
        Ok(Box::pin(async move {
            self.require_attached()?;
            if self.lifecycle != Lifecycle::Shown {
                return Err(self.invalid("move"));
            }
            let (delay, duration) = self.timing(delay, duration);
            tokio::time::sleep(delay).await;
            self.destination = Some(destination);
            self.sync();
            tokio::time::sleep(duration).await;
            Ok(delay + duration)
        }))
    }

    fn detach(&mut self) {
        if let (Some(canvas), Some(node)) = (&self.canvas, self.node.take()) {
            canvas.remove_node(node);
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<FeatureKind>,
    children: Vec<Action>,
    #[serde(skip)]
    attached: bool,
}

impl Group {
    pub fn new(tag: Option<FeatureKind>, children: Vec<Action>) -> Self {
        Self {
            tag,
            children,
            attached: false,
        }
    }

    /// A group holding a single pause marker.
    pub fn pause() -> Self {
        Self::new(
            None,
            vec![Action::Mark(Mark::new(ActionKind::Pause, Properties::new()))],
        )
    }

    pub fn tag(&self) -> Option<FeatureKind> {
        self.tag
    }

    pub fn children(&self) -> &[Action] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn push(&mut self, action: Action) {
        self.children.push(action);
    }

    pub fn contains_pause(&self) -> bool {
        self.children.iter().any(|c| match c {
            Action::Mark(m) => m.kind == ActionKind::Pause,
            Action::Group(g) => g.contains_pause(),
        })
    }

    /// Derived state: shown if any child is shown, hidden once all are.
    pub fn lifecycle(&self) -> Lifecycle {
        let states: Vec<Lifecycle> = self.children.iter().map(Action::lifecycle).collect();
        if states.contains(&Lifecycle::Shown) {
            Lifecycle::Shown
        } else if !states.is_empty() && states.iter().all(|s| *s == Lifecycle::Hidden) {
            Lifecycle::Hidden
        } else {
            Lifecycle::Created
        }
    }

    fn z_order(&self) -> u8 {
        self.children.iter().map(Action::z_order).min().unwrap_or(0)
    }
}

/// Joins child transitions: failures are logged and dropped, the slowest
/// success wins.
fn slowest(results: Vec<Result<Elapsed>>, op: &'static str) -> Elapsed {
    results
        .into_iter()
        .filter_map(|r| match r {
            Ok(elapsed) => Some(elapsed),
            Err(e) => {
                tracing::warn!(op, error = %e, "child action failed");
                None
            }
        })
        .max()
        .unwrap_or(Duration::ZERO)
}

impl Animate for Group {
    /// Stable-sorts children by z-order, then attaches each.
    fn attach(&mut self, canvas: Arc<dyn Canvas>) -> Result<()> {
        if self.attached {
            return Err(StoryError::AlreadyAttached("group".into()));
        }
        self.children.sort_by_key(Action::z_order);
        for child in &mut self.children {
            if let Err(e) = child.attach(canvas.clone()) {
                tracing::warn!(error = %e, "child attach failed");
            }
        }
        self.attached = true;
        Ok(())
    }

    fn set_props(&mut self, props: Properties) {
        for child in &mut self.children {
            child.set_props(props.clone());
        }
    }

    fn update_props(&mut self, patch: &Properties) {
        for child in &mut self.children {
            child.update_props(patch);
        }
    }

    fn set_coordinate(&mut self, origin: Coord, destination: Option<Coord>) {
        for child in &mut self.children {
            child.set_coordinate(origin, destination);
        }
    }

    fn show(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        Box::pin(async move {
            let results = join_all(self.children.iter_mut().map(|c| c.show(delay, duration))).await;
            Ok(slowest(results, "show"))
        })
    }

    fn hide(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        Box::pin(async move {
            let results = join_all(self.children.iter_mut().map(|c| c.hide(delay, duration))).await;
            Ok(slowest(results, "hide"))
        })
    }

    /// Moves every child that can move; the rest stay where they are.
    fn move_to(
        &mut self,
        destination: Coord,
        delay: Duration,
        duration: Duration,
    ) -> Result<BoxFuture<'_, Result<Elapsed>>> {
        let mut moves = Vec::new();
        for child in &mut self.children {
            match child.move_to(destination, delay, duration) {
                Ok(fut) => moves.push(fut),
                Err(StoryError::UnsupportedOperation { kind, .. }) => {
                    tracing::debug!(%kind, "skipping child that cannot move");
                }
                Err(e) => tracing::warn!(error = %e, "child move failed"),
            }
        }
        Ok(Box::pin(async move { Ok(slowest(join_all(moves).await, "move")) }))
    }

    fn detach(&mut self) {
        for child in &mut self.children {
            child.detach();
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Mark(Mark),
    Group(Group),
}

impl Action {
    /// Type-keyed factory for a table action spec.
    pub fn from_spec(spec: &ActionSpec) -> Result<Action> {
        let kind: ActionKind = spec.action.parse()?;
        Ok(Action::Mark(Mark::new(kind, spec.properties.clone())))
    }

    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            Action::Mark(m) => Some(m.kind),
            Action::Group(_) => None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Action::Mark(m) => m.lifecycle,
            Action::Group(g) => g.lifecycle(),
        }
    }

    fn z_order(&self) -> u8 {
        match self {
            Action::Mark(m) => m.kind.z_order(),
            Action::Group(g) => g.z_order(),
        }
    }
}

impl Animate for Action {
    fn attach(&mut self, canvas: Arc<dyn Canvas>) -> Result<()> {
        match self {
            Action::Mark(m) => m.attach(canvas),
            Action::Group(g) => g.attach(canvas),
        }
    }

    fn set_props(&mut self, props: Properties) {
        match self {
            Action::Mark(m) => m.set_props(props),
            Action::Group(g) => g.set_props(props),
        }
    }

    fn update_props(&mut self, patch: &Properties) {
        match self {
            Action::Mark(m) => m.update_props(patch),
            Action::Group(g) => g.update_props(patch),
        }
    }

    fn set_coordinate(&mut self, origin: Coord, destination: Option<Coord>) {
        match self {
            Action::Mark(m) => m.set_coordinate(origin, destination),
            Action::Group(g) => g.set_coordinate(origin, destination),
        }
    }

    fn show(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        match self {
            Action::Mark(m) => m.show(delay, duration),
            Action::Group(g) => g.show(delay, duration),
        }
    }

    fn hide(&mut self, delay: Duration, duration: Duration) -> BoxFuture<'_, Result<Elapsed>> {
        match self {
            Action::Mark(m) => m.hide(delay, duration),
            Action::Group(g) => g.hide(delay, duration),
        }
    }

    fn move_to(
        &mut self,
        destination: Coord,
        delay: Duration,
        duration: Duration,
    ) -> Result<BoxFuture<'_, Result<Elapsed>>> {
        match self {
            Action::Mark(m) => m.move_to(destination, delay, duration),
            Action::Group(g) => g.move_to(destination, delay, duration),
        }
    }

    fn detach(&mut self) {
        match self {
            Action::Mark(m) => m.detach(),
            Action::Group(g) => g.detach(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::recording::{Event, RecordingCanvas};
    use serde_json::json;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn props(v: serde_json::Value) -> Properties {
        v.as_object().unwrap().clone()
    }

    fn mark(kind: ActionKind) -> Mark {
        Mark::new(kind, Properties::new())
    }

    fn canvas() -> (RecordingCanvas, Arc<dyn Canvas>) {
        let rec = RecordingCanvas::new();
        let dyn_canvas: Arc<dyn Canvas> = Arc::new(rec.clone());
        (rec, dyn_canvas)
    }

    #[test]
    fn attach_creates_transparent_node() {
        let (rec, c) = canvas();
        let mut m = mark(ActionKind::Dot);
        m.attach(c).unwrap();
        let events = rec.events();
        assert!(matches!(events[0], Event::Created(_, NodeKind::Dot)));
        let Event::Geometry(_, ref g) = events[1] else {
            panic!("expected geometry")
        };
        assert_eq!(g.attributes["opacity"], json!(0.0));
        assert_eq!(m.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn attach_twice_fails() {
        let (_, c) = canvas();
        let mut m = mark(ActionKind::Circle);
        m.attach(c.clone()).unwrap();
        assert!(matches!(m.attach(c), Err(StoryError::AlreadyAttached(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn show_before_attach_fails() {
        let mut m = mark(ActionKind::Dot);
        let err = m.show(MS(0), MS(10)).await.unwrap_err();
        assert!(matches!(err, StoryError::NotAttached(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn show_then_hide_reports_elapsed() {
        let (_, c) = canvas();
        let mut m = mark(ActionKind::Dot);
        m.attach(c).unwrap();
        assert_eq!(m.show(MS(100), MS(250)).await.unwrap(), MS(350));
        assert_eq!(m.lifecycle(), Lifecycle::Shown);
        assert_eq!(m.hide(MS(0), MS(200)).await.unwrap(), MS(200));
        assert_eq!(m.lifecycle(), Lifecycle::Hidden);
        // Hidden -> Shown is allowed again
        m.show(MS(0), MS(10)).await.unwrap();
        assert_eq!(m.lifecycle(), Lifecycle::Shown);
    }

    #[tokio::test(start_paused = true)]
    async fn double_show_is_invalid() {
        let (_, c) = canvas();
        let mut m = mark(ActionKind::Dot);
        m.attach(c).unwrap();
        m.show(MS(0), MS(1)).await.unwrap();
        assert!(matches!(
            m.show(MS(0), MS(1)).await,
            Err(StoryError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hide_disabled_resolves_immediately() {
        let (rec, c) = canvas();
        let mut m = Mark::new(ActionKind::TextBox, props(json!({"hide": false})));
        m.attach(c).unwrap();
        assert_eq!(m.show(MS(0), MS(100)).await.unwrap(), MS(100));
        let fades_before = rec.events().len();
        assert_eq!(m.hide(MS(500), MS(500)).await.unwrap(), Duration::ZERO);
        assert_eq!(rec.events().len(), fades_before);
        assert_eq!(m.lifecycle(), Lifecycle::Shown);
    }

    #[test]
    fn move_unsupported_is_synchronous() {
        for kind in [ActionKind::Dot, ActionKind::Circle, ActionKind::Connector] {
            let mut m = mark(kind);
            let res = m.move_to(Coord::new(1.0, 1.0), MS(0), MS(0));
            assert!(matches!(
                res,
                Err(StoryError::UnsupportedOperation { op: "move", .. })
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn text_box_moves_while_shown() {
        let (_, c) = canvas();
        let mut m = mark(ActionKind::TextBox);
        m.attach(c).unwrap();
        m.set_coordinate(Coord::new(0.0, 0.0), Some(Coord::new(10.0, 10.0)));

        // Not yet shown
        let fut = m.move_to(Coord::new(5.0, 5.0), MS(0), MS(0)).unwrap();
        assert!(fut.await.is_err());

        m.show(MS(0), MS(0)).await.unwrap();
        let elapsed = m
            .move_to(Coord::new(40.0, 20.0), MS(10), MS(90))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(elapsed, MS(100));
        assert_eq!(m.destination(), Some(Coord::new(40.0, 20.0)));
        assert_eq!(m.lifecycle(), Lifecycle::Shown);
    }

    #[test]
    fn set_coordinate_keeps_state() {
        let (_, c) = canvas();
        let mut m = mark(ActionKind::Connector);
        m.attach(c).unwrap();
        for i in 0..3 {
            m.set_coordinate(Coord::new(i as f64, 0.0), None);
        }
        assert_eq!(m.origin(), Some(Coord::new(2.0, 0.0)));
        assert_eq!(m.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn group_attach_sorts_by_z_order() {
        let (rec, c) = canvas();
        let mut g = Group::new(
            Some(FeatureKind::Peak),
            vec![
                Action::Mark(mark(ActionKind::Connector)),
                Action::Mark(mark(ActionKind::TextBox)),
                Action::Mark(mark(ActionKind::Dot)),
                Action::Mark(mark(ActionKind::Circle)),
            ],
        );
        g.attach(c).unwrap();
        assert_eq!(
            rec.kinds_created(),
            vec![
                NodeKind::Dot,
                NodeKind::Circle,
                NodeKind::TextBox,
                NodeKind::Connector
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn group_show_waits_for_slowest_child() {
        let (rec, c) = canvas();
        let mut g = Group::new(
            None,
            vec![
                Action::Mark(Mark::new(ActionKind::Dot, props(json!({"duration_ms": 100})))),
                Action::Mark(Mark::new(ActionKind::TextBox, props(json!({"duration_ms": 300})))),
                Action::Mark(Mark::new(ActionKind::Connector, props(json!({"duration_ms": 200})))),
            ],
        );
        g.attach(c).unwrap();

        let start = tokio::time::Instant::now();
        let elapsed = g.show(MS(0), MS(50)).await.unwrap();
        assert_eq!(elapsed, MS(300));
        // Children run in parallel, not back to back.
        assert!(start.elapsed() < MS(600));

        let finished = rec
            .events()
            .iter()
            .filter(|e| matches!(e, Event::FadeFinished(_, v) if *v == 1.0))
            .count();
        assert_eq!(finished, 3);
        assert_eq!(g.lifecycle(), Lifecycle::Shown);
    }

    #[tokio::test(start_paused = true)]
    async fn group_hide_honours_hide_false_per_child() {
        let (_, c) = canvas();
        let mut g = Group::new(
            None,
            vec![
                Action::Mark(mark(ActionKind::Dot)),
                Action::Mark(Mark::new(ActionKind::TextBox, props(json!({"hide": false})))),
            ],
        );
        g.attach(c).unwrap();
        g.show(MS(0), MS(10)).await.unwrap();
        assert_eq!(g.hide(MS(0), MS(40)).await.unwrap(), MS(40));
        let states: Vec<_> = g.children().iter().map(Action::lifecycle).collect();
        assert_eq!(states, vec![Lifecycle::Hidden, Lifecycle::Shown]);
    }

    #[tokio::test(start_paused = true)]
    async fn group_move_skips_immovable_children() {
        let (_, c) = canvas();
        let mut g = Group::new(
            None,
            vec![
                Action::Mark(mark(ActionKind::Dot)),
                Action::Mark(mark(ActionKind::TextBox)),
            ],
        );
        g.attach(c).unwrap();
        g.show(MS(0), MS(0)).await.unwrap();
        let elapsed = g
            .move_to(Coord::new(3.0, 4.0), MS(0), MS(20))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(elapsed, MS(20));
        let Action::Mark(text) = &g.children()[1] else {
            panic!("expected mark")
        };
        assert_eq!(text.destination(), Some(Coord::new(3.0, 4.0)));
    }

    #[test]
    fn group_props_broadcast() {
        let mut g = Group::new(
            None,
            vec![
                Action::Mark(mark(ActionKind::Dot)),
                Action::Mark(mark(ActionKind::TextBox)),
            ],
        );
        g.set_props(props(json!({"color": "red"})));
        g.update_props(&props(json!({"align": "left"})));
        for child in g.children() {
            let Action::Mark(m) = child else { panic!() };
            assert_eq!(m.props()["color"], json!("red"));
            assert_eq!(m.props()["align"], json!("left"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pause_mark_has_no_node_and_no_time() {
        let (rec, c) = canvas();
        let mut g = Group::pause();
        assert!(g.contains_pause());
        g.attach(c).unwrap();
        assert!(rec.kinds_created().is_empty());
        assert_eq!(g.show(MS(100), MS(100)).await.unwrap(), Duration::ZERO);
    }

    #[test]
    fn detach_removes_nodes() {
        let (rec, c) = canvas();
        let mut g = Group::new(
            None,
            vec![
                Action::Mark(mark(ActionKind::Dot)),
                Action::Mark(mark(ActionKind::Connector)),
            ],
        );
        g.attach(c).unwrap();
        g.detach();
        let removed = rec
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Removed(_)))
            .count();
        assert_eq!(removed, 2);
    }

    #[test]
    fn factory_builds_marks_and_rejects_unknown() {
        let spec = ActionSpec {
            action: "TextBox".into(),
            properties: props(json!({"text": "${y}"})),
        };
        let a = Action::from_spec(&spec).unwrap();
        assert_eq!(a.kind(), Some(ActionKind::TextBox));

        let bad = ActionSpec {
            action: "hologram".into(),
            properties: Properties::new(),
        };
        assert!(matches!(
            Action::from_spec(&bad),
            Err(StoryError::UnknownActionType(_))
        ));
    }
}
