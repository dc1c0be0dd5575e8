//! Coordination context: owns the host, the registry, the per-canvas motion
//! sessions and the blit manager, and routes host events to objects.

use crate::blit::BlitManager;
use crate::config::Config;
use crate::dispatch::{Dispatch, IgnoreReason, Subscriptions};
use crate::error::{DrapoError, Result};
use crate::event::{Event, Location, MouseButton};
use crate::host::{ArtifactId, ArtifactSpec, CanvasId, Host, SubregionId};
use crate::lifecycle::{LifecycleState, ObjectCore, Recorded};
use crate::registry::{ObjectEntry, ObjectId, Registry, Scope};
use crate::select::{self, SelectOptions, Selector, Target};
use crate::session::{MotionSession, Phase};
use crate::shapes::{
    CreateContext, Cursor, CursorOptions, InteractiveShape, Line, LineOptions, Object, ObjectKind,
    Picked, Rectangle, RectangleOptions,
};
use kurbo::{Affine, Point};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Everything interactive objects share.
///
/// All mutation happens through `&mut self` on the thread running the host's
/// event loop; there is no global state.
pub struct Context<H: Host> {
    host: H,
    config: Config,
    registry: Registry,
    sessions: HashMap<CanvasId, MotionSession>,
    blit: BlitManager<H::Snapshot>,
    subscriptions: Subscriptions,
    selectors: HashMap<ObjectId, Selector>,
}

/// A validated object waiting to be registered.
struct Prepared {
    subregion: SubregionId,
    to_px: Affine,
    specs: Vec<ArtifactSpec>,
}

impl<H: Host> Context<H> {
    pub fn new(host: H, config: Config) -> Self {
        let blit = BlitManager::new(config.blit);
        Self {
            host,
            config,
            registry: Registry::new(),
            sessions: HashMap::new(),
            blit,
            subscriptions: Subscriptions::new(),
            selectors: HashMap::new(),
        }
    }

    /// Context with the default configuration.
    pub fn with_host(host: H) -> Self {
        Self::new(host, Config::default())
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn blit(&self) -> &BlitManager<H::Snapshot> {
        &self.blit
    }

    /// Global blitting flag, as last written by a constructor.
    pub fn blit_enabled(&self) -> bool {
        self.blit.enabled()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.registry.get(id)
    }

    pub fn line(&self, id: ObjectId) -> Option<&Line> {
        self.registry.get(id).and_then(|e| e.object.as_line())
    }

    pub fn rectangle(&self, id: ObjectId) -> Option<&Rectangle> {
        self.registry.get(id).and_then(|e| e.object.as_rectangle())
    }

    pub fn cursor(&self, id: ObjectId) -> Option<&Cursor> {
        self.registry.get(id).and_then(|e| e.object.as_cursor())
    }

    /// Lifecycle state; `Deleted` once the object is unregistered.
    pub fn state(&self, id: ObjectId) -> LifecycleState {
        self.registry
            .get(id)
            .map_or(LifecycleState::Deleted, |e| e.core.state)
    }

    /// Position stored by the validation key.
    pub fn recorded(&self, id: ObjectId) -> Option<Recorded> {
        self.registry.get(id).and_then(|e| e.core.recorded)
    }

    pub fn session(&self, canvas: CanvasId) -> Option<&MotionSession> {
        self.sessions.get(&canvas)
    }

    /// Phase of the motion session on `canvas`.
    pub fn phase(&self, canvas: CanvasId) -> Phase {
        self.sessions.get(&canvas).map_or(Phase::Idle, |s| s.phase())
    }

    pub fn instances_of(&self, kind: ObjectKind) -> HashSet<ObjectId> {
        self.registry.instances_of(kind)
    }

    pub fn all_instances(&self) -> HashSet<ObjectId> {
        self.registry.all_instances()
    }

    pub fn selector(&self, id: ObjectId) -> Option<&Selector> {
        self.selectors.get(&id)
    }

    fn session_active(&self, canvas: CanvasId) -> bool {
        self.sessions.get(&canvas).is_some_and(|s| s.is_active())
    }

    fn in_session(&self, canvas: CanvasId, id: ObjectId) -> bool {
        self.sessions.get(&canvas).is_some_and(|s| s.contains(id))
    }

    // --- Construction -------------------------------------------------------

    /// Create a draggable line on `canvas`.
    pub fn create_line(&mut self, canvas: CanvasId, options: LineOptions) -> Result<ObjectId> {
        let color = self.config.palette.resolve(options.color.as_deref());
        let object = Object::Line(Line::new(&options, color));
        let id = self.construct(canvas, options.subregion, object, options.blit, options.block)?;
        self.structure_changed(canvas);
        if options.block {
            self.wait(id, options.timeout);
        }
        Ok(id)
    }

    /// Create a draggable rectangle on `canvas`.
    pub fn create_rectangle(
        &mut self,
        canvas: CanvasId,
        options: RectangleOptions,
    ) -> Result<ObjectId> {
        let color = self.config.palette.resolve(options.color.as_deref());
        let object = Object::Rectangle(Rectangle::new(&options, color));
        let id = self.construct(canvas, options.subregion, object, options.blit, options.block)?;
        self.structure_changed(canvas);
        if options.block {
            self.wait(id, options.timeout);
        }
        Ok(id)
    }

    /// Create the cursor of `canvas`, replacing any previous one.
    ///
    /// The lines stay hidden until the pointer enters a subregion.
    pub fn create_cursor(&mut self, canvas: CanvasId, options: CursorOptions) -> Result<ObjectId> {
        if self.host.subregions(canvas).is_empty() {
            return Err(DrapoError::HostState(format!(
                "Cannot create a cursor on {:?} without subregions",
                canvas
            )));
        }
        let color = self.config.palette.resolve(options.color.as_deref());
        let mut object = Object::Cursor(Cursor::new(&options, color, self.config.buttons));
        // Replace only once the new cursor is known to fit the canvas.
        let prepared = self.prepare(canvas, None, &mut object)?;

        let previous: Vec<ObjectId> = self
            .registry
            .ordered()
            .iter()
            .copied()
            .filter(|id| {
                self.registry
                    .get(*id)
                    .is_some_and(|e| e.core.kind == ObjectKind::Cursor && e.core.canvas == canvas)
            })
            .collect();
        for id in previous {
            self.delete(id)?;
        }

        let id = self.commit(canvas, object, prepared, options.blit, options.block);
        if let Some(entry) = self.registry.get(id) {
            set_visible(&mut self.host, &entry.core.artifacts, false);
        }
        self.structure_changed(canvas);
        if options.block {
            self.wait(id, options.timeout);
        }
        Ok(id)
    }

    fn construct(
        &mut self,
        canvas: CanvasId,
        subregion: Option<SubregionId>,
        mut object: Object,
        blit: Option<bool>,
        block: bool,
    ) -> Result<ObjectId> {
        let prepared = self.prepare(canvas, subregion, &mut object)?;
        Ok(self.commit(canvas, object, prepared, blit, block))
    }

    /// Check the host state and compute the initial artifacts. Changes nothing.
    fn prepare(
        &self,
        canvas: CanvasId,
        subregion: Option<SubregionId>,
        object: &mut Object,
    ) -> Result<Prepared> {
        let kind = object.kind();
        let subregion = match subregion {
            Some(s) => s,
            None => self.host.current_subregion(canvas).ok_or_else(|| {
                DrapoError::HostState(format!("{:?} has no subregion", canvas))
            })?,
        };
        if self.host.canvas_of(subregion) != Some(canvas) {
            return Err(DrapoError::HostState(format!(
                "{:?} does not belong to {:?}",
                subregion, canvas
            )));
        }
        let to_px = self.host.data_to_pixel(subregion).ok_or_else(|| {
            DrapoError::HostState(format!("{:?} has no data transform", subregion))
        })?;
        let limits = self
            .host
            .data_limits(subregion)
            .ok_or_else(|| DrapoError::HostState(format!("{:?} has no data limits", subregion)))?;

        let peers = self
            .registry
            .in_subregion(subregion)
            .into_iter()
            .filter_map(|id| self.registry.get(id))
            .filter(|e| e.core.kind == kind)
            .map(|e| e.object.tracked_points())
            .collect();
        let specs = object.create(&CreateContext {
            subregion,
            to_px,
            limits,
            peers,
        })?;
        Ok(Prepared {
            subregion,
            to_px,
            specs,
        })
    }

    fn commit(
        &mut self,
        canvas: CanvasId,
        object: Object,
        prepared: Prepared,
        blit: Option<bool>,
        block: bool,
    ) -> ObjectId {
        let kind = object.kind();
        let Prepared {
            subregion,
            to_px,
            specs,
        } = prepared;
        self.blit.set_enabled(blit.unwrap_or(self.config.blit));

        let id = ObjectId::new();
        let mut core = ObjectCore::new(id, kind, canvas, subregion, to_px);
        core.block = block;
        core.artifacts = specs
            .iter()
            .map(|spec| self.host.add_artifact(subregion, spec))
            .collect();
        self.subscriptions.connect(canvas, id, kind.events());
        self.registry.register(ObjectEntry { core, object });
        log::info!("Created {} {} on {:?}", kind.name(), id, canvas);
        id
    }

    /// Invalidate the background after a structural change and redraw,
    /// unless a drag is running (the next frame recaptures).
    fn structure_changed(&mut self, canvas: CanvasId) {
        self.blit.invalidate(canvas);
        if !self.session_active(canvas) {
            self.host.redraw(canvas);
        }
    }

    // --- Lifecycle ----------------------------------------------------------

    /// Hide an object but keep its data and registration.
    pub fn erase(&mut self, id: ObjectId) -> Result<()> {
        let entry = self.registry.get(id).ok_or(DrapoError::UnknownObject(id))?;
        if entry.core.state == LifecycleState::Erased {
            return Ok(());
        }
        let canvas = entry.core.canvas;
        if self.in_session(canvas, id) {
            self.resolve_motion(canvas);
        }
        if let Some(entry) = self.registry.get_mut(id) {
            set_visible(&mut self.host, &entry.core.artifacts, false);
            entry.core.clear_motion();
            entry.core.state = LifecycleState::Erased;
            log::info!("Erased {} {}", entry.core.kind.name(), id);
        }
        self.structure_changed(canvas);
        Ok(())
    }

    /// Remove an object for good. A second call returns `UnknownObject`.
    pub fn delete(&mut self, id: ObjectId) -> Result<()> {
        let canvas = self
            .registry
            .get(id)
            .map(|e| e.core.canvas)
            .ok_or(DrapoError::UnknownObject(id))?;
        if self.in_session(canvas, id) {
            self.resolve_motion(canvas);
        }
        let Some(entry) = self.registry.unregister(id) else {
            return Err(DrapoError::UnknownObject(id));
        };
        for artifact in &entry.core.artifacts {
            self.host.remove_artifact(*artifact);
        }
        if let Some(cursor) = entry.object.as_cursor() {
            for mark in cursor.marks() {
                self.host.remove_artifact(*mark);
            }
        }
        self.subscriptions.disconnect(id);
        self.structure_changed(canvas);
        log::info!("Deleted {} {}", entry.core.kind.name(), id);
        Ok(())
    }

    /// Delete every registered object.
    pub fn clear(&mut self) {
        let ids = self.registry.ordered().to_vec();
        for id in ids {
            if self.registry.contains(id) {
                let _ = self.delete(id);
            }
        }
    }

    /// Delete the other objects of the same kind as `id` within `scope`.
    ///
    /// Returns how many were deleted.
    pub fn delete_others(&mut self, id: ObjectId, scope: Scope) -> Result<usize> {
        if !self.registry.contains(id) {
            return Err(DrapoError::UnknownObject(id));
        }
        let others = self.registry.peers(id, scope);
        let count = others.len();
        for other in others {
            self.delete(other)?;
        }
        Ok(count)
    }

    /// Remove the click marks of a cursor; recorded positions stay.
    pub fn erase_marks(&mut self, id: ObjectId) -> Result<()> {
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(DrapoError::UnknownObject(id))?;
        let canvas = entry.core.canvas;
        if let Some(cursor) = entry.object.as_cursor_mut() {
            for mark in cursor.marks.drain(..) {
                self.host.remove_artifact(mark);
            }
        }
        self.structure_changed(canvas);
        Ok(())
    }

    /// Forget the click positions recorded by a cursor; marks stay drawn.
    pub fn erase_data(&mut self, id: ObjectId) -> Result<()> {
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(DrapoError::UnknownObject(id))?;
        let cursor = entry.object.as_cursor_mut().ok_or(DrapoError::WrongKind {
            id,
            expected: ObjectKind::Cursor,
        })?;
        cursor.erase_data();
        log::debug!("Cursor {} click data erased", id);
        Ok(())
    }

    /// Record the position of a line or rectangle, then erase it.
    fn validate(&mut self, id: ObjectId) {
        if let Some(entry) = self.registry.get_mut(id) {
            entry.core.recorded = match &entry.object {
                Object::Line(line) => Some(Recorded::Line(line.position())),
                Object::Rectangle(rect) => {
                    let (x, y, w, h) = rect.position();
                    Some(Recorded::Rectangle(x, y, w, h))
                }
                Object::Cursor(_) => None,
            };
            log::info!("{} {} position recorded", entry.core.kind.name(), id);
        }
        let _ = self.erase(id);
    }

    // --- Motion -------------------------------------------------------------

    /// Start a drag on the canvas of `id`, with `id` as leader.
    ///
    /// Returns `Ok(false)` when another drag is already running there or when
    /// `id` is a cursor. Live cursors on the canvas join as followers.
    pub fn begin_motion(&mut self, id: ObjectId, pointer_px: Point, picked: Picked) -> Result<bool> {
        let entry = self.registry.get(id).ok_or(DrapoError::UnknownObject(id))?;
        if entry.core.kind == ObjectKind::Cursor || !entry.core.state.is_live() {
            return Ok(false);
        }
        let canvas = entry.core.canvas;
        if !self.sessions.entry(canvas).or_default().elect(id) {
            log::debug!("Drag already running on {:?}, press ignored", canvas);
            return Ok(false);
        }
        self.prepare_member(id, pointer_px, &picked);

        let cursors: Vec<ObjectId> = self
            .registry
            .on_canvas(canvas)
            .into_iter()
            .filter(|other| {
                self.registry.get(*other).is_some_and(|e| {
                    e.core.kind == ObjectKind::Cursor && e.core.state.is_live()
                })
            })
            .collect();
        for cursor in cursors {
            self.join_motion(canvas, cursor, pointer_px, &Picked::default());
        }
        self.blit.invalidate(canvas);
        log::debug!("Drag started on {:?}, leader {}", canvas, id);
        Ok(true)
    }

    fn join_motion(&mut self, canvas: CanvasId, id: ObjectId, pointer_px: Point, picked: &Picked) {
        if let Some(session) = self.sessions.get_mut(&canvas) {
            session.add_follower(id);
            self.prepare_member(id, pointer_px, picked);
        }
    }

    fn prepare_member(&mut self, id: ObjectId, pointer_px: Point, picked: &Picked) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        if let Some(to_px) = self.host.data_to_pixel(entry.core.subregion) {
            entry.core.to_px = to_px;
        }
        entry.core.press = Some(entry.object.capture_press_info(pointer_px, entry.core.to_px));
        entry.core.active = entry.object.capture_active_info(picked);
        entry.core.picked = Some(picked.clone());
        entry.core.state = LifecycleState::Active;
    }

    /// Move every member of the canvas's drag to `pointer_px` and draw a frame.
    pub fn step_motion(&mut self, canvas: CanvasId, pointer_px: Point) {
        let Some(session) = self.sessions.get_mut(&canvas) else {
            return;
        };
        if !session.is_active() {
            return;
        }
        session.start_dragging();
        let members = session.members();

        let mut frame: Vec<ArtifactId> = Vec::new();
        for id in members {
            let Some(entry) = self.registry.get_mut(id) else {
                continue;
            };
            if let (Some(press), Some(active)) = (&entry.core.press, &entry.core.active) {
                entry
                    .object
                    .recompute_position(pointer_px, press, active, entry.core.to_px);
            }
            sync_artifacts(&mut self.host, entry);
            if is_drawn(entry) {
                frame.extend(entry.core.artifacts.iter().copied());
            }
        }
        self.blit.draw_frame(&mut self.host, canvas, &frame);
    }

    /// End the drag on `canvas` and redraw it.
    pub fn resolve_motion(&mut self, canvas: CanvasId) {
        let Some(session) = self.sessions.get_mut(&canvas) else {
            return;
        };
        if !session.is_active() {
            return;
        }
        for id in session.resolve() {
            if let Some(entry) = self.registry.get_mut(id) {
                entry.core.clear_motion();
            }
        }
        self.blit.invalidate(canvas);
        self.host.redraw(canvas);
        log::debug!("Drag resolved on {:?}", canvas);
    }

    // --- Selection ----------------------------------------------------------

    /// Let the user make a canvas, and the subregion under the pointer,
    /// current by clicking on it.
    ///
    /// Listens on every canvas open at call time. Fails when there is none.
    pub fn click_select(&mut self, options: SelectOptions) -> Result<ObjectId> {
        let canvases = self.host.canvases();
        if canvases.is_empty() {
            return Err(DrapoError::HostState("No canvas to select from".to_string()));
        }
        let id = ObjectId::new();
        for canvas in &canvases {
            self.subscriptions.connect(*canvas, id, select::EVENTS);
        }
        log::info!("Selector {} listening on {} canvas(es)", id, canvases.len());
        self.selectors.insert(id, Selector::new(options, canvases));
        Ok(id)
    }

    /// Stop a selector and restore the faces it lit. Stopping twice is a no-op.
    pub fn stop_selector(&mut self, id: ObjectId) -> Result<()> {
        let selector = self
            .selectors
            .get_mut(&id)
            .ok_or(DrapoError::UnknownObject(id))?;
        let was_active = selector.is_active();
        let lit = selector.stop();
        for target in lit {
            self.paint_face(target, false);
        }
        self.subscriptions.disconnect(id);
        if was_active {
            log::info!("Selector {} stopped", id);
        }
        Ok(())
    }

    fn on_selector(&mut self, id: ObjectId, event: &Event) -> bool {
        let Some(selector) = self.selectors.get_mut(&id) else {
            return false;
        };
        if !selector.is_active() {
            return false;
        }
        let (target, lit) = match event {
            Event::CanvasEnter { canvas } => {
                let target = Target::canvas(*canvas);
                if !selector.enter(target) {
                    return false;
                }
                (target, true)
            }
            Event::CanvasLeave { canvas } => {
                let target = Target::canvas(*canvas);
                if !selector.leave(target) {
                    return false;
                }
                (target, false)
            }
            Event::Enter { at } => {
                let target = Target::at(at);
                if target.subregion.is_none() || !selector.enter(target) {
                    return false;
                }
                (target, true)
            }
            Event::Leave { at, subregion } => {
                let target = Target::subregion(at.canvas, *subregion);
                if !selector.leave(target) {
                    return false;
                }
                (target, false)
            }
            Event::Press { at, button } => {
                let chosen = selector.press(Target::at(at), *button);
                let stopped = !selector.is_active();
                if let Some(target) = chosen {
                    self.host.set_current(target.canvas, target.subregion);
                    log::info!("Selector {} made {:?} current", id, target);
                }
                if stopped {
                    let _ = self.stop_selector(id);
                }
                return chosen.is_some() || stopped;
            }
            Event::Close { canvas } => {
                selector.forget_canvas(*canvas);
                return false;
            }
            _ => return false,
        };
        self.paint_face(target, lit);
        true
    }

    fn paint_face(&mut self, target: Target, lit: bool) {
        let color = lit.then(|| target.highlight());
        self.host.set_face(target.canvas, target.subregion, color);
        self.structure_changed(target.canvas);
    }

    // --- Event routing ------------------------------------------------------

    /// Route one host event to the objects subscribed to it.
    pub fn dispatch(&mut self, event: &Event) -> Dispatch {
        let canvas = event.canvas();
        let (selectors, subscribers): (Vec<ObjectId>, Vec<ObjectId>) = self
            .subscriptions
            .subscribers(canvas, event.kind())
            .into_iter()
            .partition(|id| self.selectors.contains_key(id));
        if selectors.is_empty() && subscribers.is_empty() {
            return Dispatch::Ignored(IgnoreReason::NoSubscribers);
        }
        let mut selected = false;
        for id in selectors {
            selected |= self.on_selector(id, event);
        }
        if subscribers.is_empty() {
            return if selected {
                Dispatch::Handled
            } else {
                Dispatch::Ignored(IgnoreReason::NoEffect)
            };
        }
        let outcome = match event {
            Event::Press { at, button } => self.on_press(at, *button, &subscribers),
            Event::Release { at, button } => self.on_release(at, *button, &subscribers),
            Event::Motion { at } => self.on_motion(at, &subscribers),
            Event::Key { at, key } => self.on_key(at, key, &subscribers),
            Event::Enter { at } => self.on_enter(at, &subscribers),
            Event::Leave { at, subregion } => self.on_leave(at, *subregion, &subscribers),
            Event::Resize { canvas } => self.on_resize(*canvas),
            Event::Close { canvas } => self.on_close(*canvas),
            Event::CanvasEnter { .. } | Event::CanvasLeave { .. } => {
                Dispatch::Ignored(IgnoreReason::NoEffect)
            }
        };
        if selected {
            Dispatch::Handled
        } else {
            outcome
        }
    }

    /// Dispatch host events until `done` holds.
    ///
    /// Returns `false` if the timeout elapsed or the host ran out of events
    /// first.
    pub fn run_until(
        &mut self,
        timeout: Option<Duration>,
        mut done: impl FnMut(&Self) -> bool,
    ) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if done(self) {
                return true;
            }
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        log::debug!("Event loop timed out");
                        return false;
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            match self.host.next_event(remaining) {
                Some(event) => {
                    self.dispatch(&event);
                }
                None => return done(self),
            }
        }
    }

    /// Block until `id` is erased or deleted.
    pub fn wait(&mut self, id: ObjectId, timeout: Option<Duration>) -> bool {
        self.run_until(timeout, |ctx| !ctx.state(id).is_live())
    }

    fn live(&self, id: ObjectId) -> Option<(ObjectKind, SubregionId)> {
        self.registry
            .get(id)
            .filter(|e| e.core.state.is_live())
            .map(|e| (e.core.kind, e.core.subregion))
    }

    fn on_press(&mut self, at: &Location, button: MouseButton, subscribers: &[ObjectId]) -> Dispatch {
        let canvas = at.canvas;
        let mut handled = false;
        let mut busy = false;
        let mut elected = false;

        for &id in subscribers {
            let Some((kind, object_subregion)) = self.live(id) else {
                continue;
            };
            if kind == ObjectKind::Cursor {
                self.cursor_press(id, at);
                handled = true;
                continue;
            }
            // Cursors see every press, pans started outside included.
            let Some(subregion) = at.subregion.filter(|s| *s == object_subregion) else {
                continue;
            };
            let Some(to_px) = self.host.data_to_pixel(subregion) else {
                continue;
            };
            let Some(picked) = self
                .registry
                .get(id)
                .and_then(|e| e.object.pick(at.pixel, to_px))
            else {
                continue;
            };

            if button == self.config.buttons.remove {
                log::info!("{} {} removed by click", kind.name(), id);
                handled |= self.delete(id).is_ok();
            } else if button == MouseButton::Left {
                if elected {
                    self.join_motion(canvas, id, at.pixel, &picked);
                    handled = true;
                } else {
                    match self.begin_motion(id, at.pixel, picked) {
                        Ok(true) => {
                            elected = true;
                            handled = true;
                        }
                        Ok(false) => busy = true,
                        Err(err) => log::warn!("Cannot start drag: {}", err),
                    }
                }
            }
        }

        if handled {
            Dispatch::Handled
        } else if busy {
            Dispatch::Ignored(IgnoreReason::SessionBusy)
        } else if at.subregion.is_none() {
            Dispatch::Ignored(IgnoreReason::OutsideSubregion)
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    fn on_release(&mut self, at: &Location, button: MouseButton, subscribers: &[ObjectId]) -> Dispatch {
        let canvas = at.canvas;
        let mut handled = false;
        for &id in subscribers {
            let Some((kind, _)) = self.live(id) else {
                continue;
            };
            if kind == ObjectKind::Cursor {
                self.cursor_release(id, at, button);
                handled = true;
            } else if self.in_session(canvas, id) {
                self.resolve_motion(canvas);
                handled = true;
            }
        }
        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    fn on_motion(&mut self, at: &Location, subscribers: &[ObjectId]) -> Dispatch {
        let canvas = at.canvas;
        let leader = self.sessions.get(&canvas).and_then(|s| s.leader());
        let mut handled = false;
        for &id in subscribers {
            let Some((kind, _)) = self.live(id) else {
                continue;
            };
            if kind == ObjectKind::Cursor {
                handled |= self.cursor_motion(id, at);
            } else if leader == Some(id) {
                // Followers are moved by the leader's frame.
                self.step_motion(canvas, at.pixel);
                handled = true;
            }
        }
        if handled {
            Dispatch::Handled
        } else if at.subregion.is_none() {
            Dispatch::Ignored(IgnoreReason::OutsideSubregion)
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    fn on_key(&mut self, at: &Location, key: &str, subscribers: &[ObjectId]) -> Dispatch {
        let mut handled = false;
        for &id in subscribers {
            let Some((kind, _)) = self.live(id) else {
                continue;
            };
            match kind {
                ObjectKind::Cursor => handled |= self.cursor_key(id, at, key),
                ObjectKind::Line | ObjectKind::Rectangle => {
                    if key == self.config.keys.stop {
                        self.validate(id);
                        handled = true;
                    }
                }
            }
        }
        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    fn on_enter(&mut self, at: &Location, subscribers: &[ObjectId]) -> Dispatch {
        let mut handled = false;
        for &id in subscribers {
            if let Some((ObjectKind::Cursor, _)) = self.live(id) {
                handled |= self.cursor_enter(id, at);
            }
        }
        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    fn on_leave(&mut self, at: &Location, subregion: SubregionId, subscribers: &[ObjectId]) -> Dispatch {
        let mut handled = false;
        for &id in subscribers {
            if let Some((ObjectKind::Cursor, current)) = self.live(id) {
                if current == subregion {
                    self.cursor_leave(id, at.canvas);
                    handled = true;
                }
            }
        }
        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Ignored(IgnoreReason::NoEffect)
        }
    }

    /// Recompute transforms and limits of every object on `canvas`.
    fn on_resize(&mut self, canvas: CanvasId) -> Dispatch {
        for id in self.registry.on_canvas(canvas) {
            self.refresh_geometry(id);
            if let Some(entry) = self.registry.get(id) {
                sync_artifacts(&mut self.host, entry);
            }
        }
        self.blit.invalidate(canvas);
        self.host.redraw(canvas);
        log::debug!("Resized {:?}", canvas);
        Dispatch::Handled
    }

    fn on_close(&mut self, canvas: CanvasId) -> Dispatch {
        for id in self.registry.on_canvas(canvas) {
            let _ = self.delete(id);
        }
        self.sessions.remove(&canvas);
        self.blit.invalidate(canvas);
        log::info!("{:?} closed", canvas);
        Dispatch::Handled
    }

    fn refresh_geometry(&mut self, id: ObjectId) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let subregion = entry.core.subregion;
        if let Some(to_px) = self.host.data_to_pixel(subregion) {
            entry.core.to_px = to_px;
        }
        if let (Some(cursor), Some(limits)) = (
            entry.object.as_cursor_mut(),
            self.host.data_limits(subregion),
        ) {
            cursor.set_limits(limits);
        }
    }

    // --- Cursor behaviour ---------------------------------------------------

    fn cursor_press(&mut self, id: ObjectId, at: &Location) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let canvas = entry.core.canvas;
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return;
        };
        cursor.pressed = true;
        cursor.press_position = at.data;
        if cursor.is_shown() {
            set_visible(&mut self.host, &entry.core.artifacts, false);
            self.structure_changed(canvas);
        }
    }

    fn cursor_release(&mut self, id: ObjectId, at: &Location, button: MouseButton) {
        self.refresh_geometry(id);
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let canvas = entry.core.canvas;
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return;
        };
        cursor.pressed = false;
        // Pan and zoom drags move the pointer between press and release.
        let click = at.data.filter(|d| Some(*d) == cursor.press_position);
        cursor.press_position = None;
        let buttons = cursor.buttons();
        if cursor.is_shown() && at.subregion == Some(entry.core.subregion) {
            if let Some(data) = at.data {
                cursor.follow(data);
            }
            sync_artifacts(&mut self.host, entry);
            set_visible(&mut self.host, &entry.core.artifacts, true);
            self.structure_changed(canvas);
        }

        if let Some(data) = click {
            if button == buttons.add {
                self.cursor_add(id, data);
            } else if button == buttons.pop {
                self.cursor_pop(id);
            }
        }
        if self.cursor(id).is_some_and(|c| c.reached_limit()) || button == buttons.stop {
            log::info!("Cursor {} stopped (click limit or stop button)", id);
            let _ = self.erase(id);
        }
    }

    fn cursor_motion(&mut self, id: ObjectId, at: &Location) -> bool {
        let (Some(subregion), Some(data)) = (at.subregion, at.data) else {
            return false;
        };
        let entered = self.registry.get(id).is_some_and(|e| {
            e.core.subregion == subregion && e.object.as_cursor().is_some_and(|c| c.in_subregion)
        });
        if !entered {
            return self.cursor_enter(id, at);
        }
        let canvas = at.canvas;
        if self.session_active(canvas) {
            return false;
        }
        let Some(entry) = self.registry.get_mut(id) else {
            return false;
        };
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return false;
        };
        if !cursor.is_shown() || cursor.pressed {
            return false;
        }
        cursor.follow(data);
        sync_artifacts(&mut self.host, entry);
        let artifacts = entry.core.artifacts.clone();
        self.blit.draw_frame(&mut self.host, canvas, &artifacts);
        true
    }

    fn cursor_enter(&mut self, id: ObjectId, at: &Location) -> bool {
        let (Some(subregion), Some(data)) = (at.subregion, at.data) else {
            return false;
        };
        let canvas = at.canvas;
        let Some(entry) = self.registry.get_mut(id) else {
            return false;
        };
        if entry.core.subregion != subregion {
            // Respawn the lines in the new subregion; marks stay where they were.
            for artifact in entry.core.artifacts.drain(..) {
                self.host.remove_artifact(artifact);
            }
            entry.core.subregion = subregion;
        }
        self.refresh_geometry(id);

        let Some(entry) = self.registry.get_mut(id) else {
            return false;
        };
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return false;
        };
        cursor.in_subregion = true;
        cursor.follow(data);
        let shown = cursor.is_shown() && !cursor.pressed;
        if entry.core.artifacts.is_empty() {
            entry.core.artifacts = entry
                .object
                .artifacts()
                .iter()
                .map(|spec| self.host.add_artifact(subregion, spec))
                .collect();
        } else {
            sync_artifacts(&mut self.host, entry);
        }
        set_visible(&mut self.host, &entry.core.artifacts, shown);
        let artifacts = entry.core.artifacts.clone();

        self.blit.invalidate(canvas);
        if self.session_active(canvas) {
            return true;
        }
        if shown {
            self.blit.draw_frame(&mut self.host, canvas, &artifacts);
        } else {
            self.host.redraw(canvas);
        }
        true
    }

    fn cursor_leave(&mut self, id: ObjectId, canvas: CanvasId) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return;
        };
        cursor.in_subregion = false;
        if cursor.visible && !cursor.pressed {
            set_visible(&mut self.host, &entry.core.artifacts, false);
            self.structure_changed(canvas);
        }
    }

    fn cursor_key(&mut self, id: ObjectId, at: &Location, key: &str) -> bool {
        let keys = self.config.keys.clone();
        let Some(entry) = self.registry.get_mut(id) else {
            return false;
        };
        let canvas = entry.core.canvas;
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return false;
        };

        let mut handled = true;
        let mut restyled = false;
        if key == keys.toggle_visibility {
            cursor.visible = !cursor.visible;
            if let (true, Some(data)) = (cursor.visible, at.data) {
                cursor.follow(data);
            }
            let shown = cursor.is_shown();
            sync_artifacts(&mut self.host, entry);
            set_visible(&mut self.host, &entry.core.artifacts, shown);
            self.structure_changed(canvas);
        } else if key == keys.wider {
            cursor.wider();
            restyled = true;
        } else if key == keys.narrower {
            cursor.narrower();
            restyled = true;
        } else if key == keys.next_color || key == keys.previous_color {
            let step = if key == keys.next_color { 1 } else { -1 };
            let color = self.config.palette.cycle(cursor.color(), step);
            cursor.set_color(color);
            restyled = true;
        } else if key == keys.add {
            match at.data {
                Some(data) => self.cursor_add(id, data),
                None => handled = false,
            }
        } else if key == keys.pop {
            self.cursor_pop(id);
        } else if key != keys.stop {
            handled = false;
        }

        if restyled {
            if let Some(entry) = self.registry.get(id) {
                sync_artifacts(&mut self.host, entry);
            }
            self.structure_changed(canvas);
        }

        if self.cursor(id).is_some_and(|c| c.reached_limit()) || key == keys.stop {
            log::info!("Cursor {} stopped (click limit or stop key)", id);
            let _ = self.erase(id);
            handled = true;
        }
        handled
    }

    fn cursor_add(&mut self, id: ObjectId, data: Point) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let canvas = entry.core.canvas;
        let subregion = entry.core.subregion;
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return;
        };
        let marked = cursor.shows_clicks();
        if let Some(mark) = cursor.record(data) {
            let artifact = self.host.add_artifact(subregion, &mark);
            cursor.marks.push(artifact);
        }
        log::debug!("Cursor {} recorded ({:.3}, {:.3})", id, data.x, data.y);
        if marked {
            self.structure_changed(canvas);
        }
    }

    fn cursor_pop(&mut self, id: ObjectId) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let canvas = entry.core.canvas;
        let Some(cursor) = entry.object.as_cursor_mut() else {
            return;
        };
        let marked = cursor.shows_clicks();
        if let Some(mark) = cursor.pop() {
            self.host.remove_artifact(mark);
        }
        if marked {
            self.structure_changed(canvas);
        }
    }
}

/// Push the current geometry of an object to its host artifacts.
fn sync_artifacts<H: Host>(host: &mut H, entry: &ObjectEntry) {
    for (artifact, spec) in entry.core.artifacts.iter().zip(entry.object.artifacts()) {
        host.update_artifact(*artifact, &spec);
    }
}

fn set_visible<H: Host>(host: &mut H, artifacts: &[ArtifactId], visible: bool) {
    for artifact in artifacts {
        host.set_visible(*artifact, visible);
    }
}

/// Whether the artifacts of a moving object belong in motion frames.
fn is_drawn(entry: &ObjectEntry) -> bool {
    match entry.object.as_cursor() {
        Some(cursor) => cursor.is_shown() && !cursor.pressed,
        None => entry.core.state.is_live(),
    }
}
