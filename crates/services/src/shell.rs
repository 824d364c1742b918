//! Component Shell: resolves content, mounts one tracker at a time and
//! routes its commands to the sync service without ever awaiting a write.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use course_core::model::{ComponentKind, Course, CourseClass, DraftSet, Fraction, SyncPolicy};
use storage::DraftStore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ContentApi, ProgressApi};
use crate::error::{ContentApiError, ShellError};
use crate::observer::{SyncObserver, TracingObserver};
use crate::sync_service::ProgressSyncService;
use crate::timers::{DwellTimer, SeekDirection};
use crate::trackers::{
    MediaEffect, MediaEvent, MediaPlaybackTracker, PlaybackState, ProgressCommand,
    ResponseCompletionTracker, TimedReadingTracker,
};

/// Collaborators shared by every mounted component.
#[derive(Clone)]
pub struct ShellContext {
    content: Arc<dyn ContentApi>,
    progress: Arc<dyn ProgressApi>,
    drafts: DraftStore,
    policy: SyncPolicy,
    observer: Arc<dyn SyncObserver>,
}

impl ShellContext {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentApi>,
        progress: Arc<dyn ProgressApi>,
        drafts: DraftStore,
    ) -> Self {
        Self {
            content,
            progress,
            drafts,
            policy: SyncPolicy::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }
}

/// Which component of a class to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentPosition {
    Index(usize),
    /// Used when rolling back into the previous class.
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Where the view goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Component {
        slug: String,
        class_index: usize,
        position: ComponentPosition,
    },
    CourseOverview {
        slug: String,
    },
}

/// The tracker mounted for the active component.
pub enum ActiveTracker {
    Media(MediaPlaybackTracker),
    Reading(Arc<Mutex<TimedReadingTracker>>),
    Responses(ResponseCompletionTracker),
    /// Additional materials complete only through the explicit action.
    Materials,
}

pub struct ComponentShell {
    ctx: ShellContext,
    course: Course,
    class: CourseClass,
    position: usize,
    kind: ComponentKind,
    sync: ProgressSyncService,
    tracker: ActiveTracker,
    dwell: Option<DwellTimer>,
}

impl ComponentShell {
    /// Resolve content, fetch progress and mount the requested component.
    ///
    /// Must be called from within a tokio runtime. Out-of-range positions
    /// open the last component of the class.
    ///
    /// # Errors
    ///
    /// Returns a `ShellError` for which `is_not_found()` holds when the course
    /// or class cannot be resolved, or the content API's own error. Progress
    /// fetch failures are not errors.
    pub async fn load(
        ctx: ShellContext,
        slug: &str,
        class_index: usize,
        position: ComponentPosition,
    ) -> Result<Self, ShellError> {
        let course = match ctx.content.course(slug).await {
            Ok(course) => course,
            Err(ContentApiError::NotFound) => {
                return Err(ShellError::CourseNotFound { slug: slug.into() });
            }
            Err(err) => return Err(err.into()),
        };
        let not_found = || ShellError::ClassNotFound {
            slug: slug.into(),
            class_index,
        };
        if class_index >= course.class_count() {
            return Err(not_found());
        }
        let class = match ctx.content.class(slug, class_index).await {
            Ok(class) => class,
            Err(ContentApiError::NotFound) => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };

        let last = class.components().len().saturating_sub(1);
        let position = match position {
            ComponentPosition::Index(index) => index.min(last),
            ComponentPosition::Last => last,
        };
        let kind = class.component(position).ok_or_else(not_found)?;

        let sync = ProgressSyncService::new(
            ctx.progress.clone(),
            course.id().clone(),
            class.id().clone(),
            ctx.policy.clone(),
        )
        .with_observer(ctx.observer.clone());
        sync.fetch().await;

        let mut shell = Self {
            ctx,
            course,
            class,
            position,
            kind,
            sync,
            tracker: ActiveTracker::Materials,
            dwell: None,
        };
        shell.mount().await;
        info!(
            course = %shell.course.slug(),
            class_index,
            kind = %shell.kind(),
            "component mounted"
        );
        Ok(shell)
    }

    /// Load the target of a route; `None` for the course overview.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn open(ctx: ShellContext, route: &Route) -> Result<Option<Self>, ShellError> {
        match route {
            Route::Component {
                slug,
                class_index,
                position,
            } => Self::load(ctx, slug, *class_index, *position).await.map(Some),
            Route::CourseOverview { .. } => Ok(None),
        }
    }

    async fn mount(&mut self) {
        let kind = self.kind();
        let policy = self.ctx.policy.clone();
        let completed = self.sync.is_completed(kind);

        if kind != ComponentKind::Video && !completed {
            let start = policy.start_fraction();
            if self.sync.fraction(kind) < start {
                self.submit(ProgressCommand::Update {
                    kind,
                    fraction: start,
                });
            }
        }

        self.tracker = match kind {
            ComponentKind::Video => ActiveTracker::Media(MediaPlaybackTracker::new(
                policy,
                self.sync.fraction(kind),
                completed,
            )),
            ComponentKind::KeyConcepts => {
                let tracker = Arc::new(Mutex::new(TimedReadingTracker::new(
                    &policy,
                    Instant::now(),
                    completed,
                )));
                if !completed {
                    self.dwell = Some(DwellTimer::spawn(
                        tracker.clone(),
                        self.sync.clone(),
                        Duration::from_secs(u64::from(policy.tick_secs())),
                    ));
                }
                ActiveTracker::Reading(tracker)
            }
            ComponentKind::WritingPrompts => {
                let drafts = match self
                    .ctx
                    .drafts
                    .load(self.course.id(), self.class.id())
                    .await
                {
                    Ok(drafts) => drafts,
                    Err(err) => {
                        warn!(error = %err, "stored drafts unreadable; starting empty");
                        DraftSet::new()
                    }
                };
                let mut tracker = ResponseCompletionTracker::new(
                    &policy,
                    self.class.writing_prompts().len(),
                    drafts,
                    completed,
                );
                if let Some(command) = tracker.on_mount() {
                    self.submit(command);
                }
                ActiveTracker::Responses(tracker)
            }
            ComponentKind::AdditionalMaterials => ActiveTracker::Materials,
        };
    }

    fn submit(&self, command: ProgressCommand) {
        drop(self.sync.submit(command));
    }

    #[must_use]
    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn class(&self) -> &CourseClass {
        &self.class
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Kind of the active component.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn sync(&self) -> &ProgressSyncService {
        &self.sync
    }

    #[must_use]
    pub fn tracker(&self) -> &ActiveTracker {
        &self.tracker
    }

    #[must_use]
    pub fn playback_state(&self) -> Option<PlaybackState> {
        match &self.tracker {
            ActiveTracker::Media(media) => Some(media.state()),
            _ => None,
        }
    }

    /// Time spent on a reading component, for display.
    #[must_use]
    pub fn reading_elapsed(&self) -> Option<Duration> {
        match &self.tracker {
            ActiveTracker::Reading(tracker) => Some(
                tracker
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .elapsed(),
            ),
            _ => None,
        }
    }

    /// Mean fraction over the class's components.
    #[must_use]
    pub fn aggregate_progress(&self) -> Fraction {
        self.sync.aggregate(self.class.components())
    }

    #[must_use]
    pub fn completion_flags(&self) -> Vec<(ComponentKind, bool)> {
        self.class
            .components()
            .iter()
            .map(|kind| (*kind, self.sync.is_completed(*kind)))
            .collect()
    }

    /// Feed a media element event. Returns a position to seek the element to.
    pub fn handle_media(&mut self, event: MediaEvent) -> Option<f64> {
        let ActiveTracker::Media(media) = &mut self.tracker else {
            return None;
        };
        let effects = media.handle(event);
        self.apply_media_effects(effects)
    }

    pub fn skip(&mut self, direction: SeekDirection) -> Option<f64> {
        let ActiveTracker::Media(media) = &mut self.tracker else {
            return None;
        };
        let effects: Vec<MediaEffect> = direction.apply(media).into_iter().collect();
        self.apply_media_effects(effects)
    }

    fn apply_media_effects(&self, effects: Vec<MediaEffect>) -> Option<f64> {
        let mut seek = None;
        for effect in effects {
            match effect {
                MediaEffect::Seek(position) => seek = Some(position),
                MediaEffect::Sync(command) => self.submit(command),
            }
        }
        seek
    }

    /// Persist an edited prompt response and complete the component once
    /// every prompt qualifies. Edits outside the prompt list are ignored.
    ///
    /// Completion is submitted before the drafts are saved, so a storage
    /// failure never loses it.
    ///
    /// # Errors
    ///
    /// Returns `ShellError::Storage` if the drafts cannot be saved.
    pub async fn edit_response(
        &mut self,
        prompt_index: usize,
        text: impl Into<String>,
    ) -> Result<(), ShellError> {
        let ActiveTracker::Responses(tracker) = &mut self.tracker else {
            return Ok(());
        };
        if prompt_index >= tracker.prompt_count() {
            debug!(prompt_index, "edit outside prompt list ignored");
            return Ok(());
        }
        if let Some(command) = tracker.edit(prompt_index, text) {
            drop(self.sync.submit(command));
        }
        self.ctx
            .drafts
            .save(self.course.id(), self.class.id(), tracker.drafts())
            .await?;
        Ok(())
    }

    /// Explicit "Mark as Complete": always submits, then routes to the
    /// course overview.
    pub fn mark_as_complete(&mut self) -> Route {
        let kind = self.kind;
        match &mut self.tracker {
            ActiveTracker::Media(media) => media.mark_completed(),
            ActiveTracker::Reading(tracker) => tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .close_gate(),
            ActiveTracker::Responses(tracker) => tracker.close_gate(),
            ActiveTracker::Materials => {}
        }
        self.dwell = None;
        self.submit(ProgressCommand::MarkComplete { kind });
        self.overview()
    }

    /// Flush the locally advanced fraction of the component and stop its
    /// timers. Throttling still applies to the flushed value.
    pub fn leave_component(&mut self) {
        self.dwell = None;
        if let ActiveTracker::Media(media) = &self.tracker {
            if let Some(fraction) = media.fraction().filter(|_| !media.is_completed()) {
                self.submit(ProgressCommand::Update {
                    kind: ComponentKind::Video,
                    fraction,
                });
            }
        }
    }

    /// Leave the component and compute the adjacent route. Never waits on
    /// pending writes.
    pub fn navigate(&mut self, direction: Direction) -> Route {
        self.leave_component();
        let slug = self.course.slug().to_owned();
        let class_index = self.class.index();
        let last = self.class.components().len().saturating_sub(1);

        let (class_index, position) = match direction {
            Direction::Next if self.position < last => {
                (class_index, ComponentPosition::Index(self.position + 1))
            }
            Direction::Next if class_index + 1 < self.course.class_count() => {
                (class_index + 1, ComponentPosition::Index(0))
            }
            Direction::Previous if self.position > 0 => {
                (class_index, ComponentPosition::Index(self.position - 1))
            }
            Direction::Previous if class_index > 0 => (class_index - 1, ComponentPosition::Last),
            Direction::Next | Direction::Previous => return self.overview(),
        };
        Route::Component {
            slug,
            class_index,
            position,
        }
    }

    fn overview(&self) -> Route {
        Route::CourseOverview {
            slug: self.course.slug().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::InMemoryStore;

    use crate::testing::{FlakyStore, RecordingApi, StaticContent, WriteCall};

    fn context(api: &Arc<RecordingApi>) -> ShellContext {
        ShellContext::new(
            Arc::new(StaticContent::sample()),
            api.clone(),
            DraftStore::new(Arc::new(InMemoryStore::default())),
        )
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let api = Arc::new(RecordingApi::default());
        let err = ComponentShell::load(context(&api), "missing", 0, ComponentPosition::Index(0))
            .await
            .err()
            .unwrap();
        assert!(err.is_not_found());
        assert!(matches!(err, ShellError::CourseNotFound { .. }));
    }

    #[tokio::test]
    async fn class_past_the_end_is_not_found() {
        let api = Arc::new(RecordingApi::default());
        let err = ComponentShell::load(context(&api), "calm", 7, ComponentPosition::Index(0))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ShellError::ClassNotFound { class_index: 7, .. }));
    }

    #[tokio::test]
    async fn previous_from_first_component_goes_to_overview() {
        let api = Arc::new(RecordingApi::default());
        let mut shell = ComponentShell::load(context(&api), "calm", 0, ComponentPosition::Index(0))
            .await
            .unwrap();
        assert_eq!(
            shell.navigate(Direction::Previous),
            Route::CourseOverview { slug: "calm".into() }
        );
        assert_eq!(
            shell.navigate(Direction::Next),
            Route::Component {
                slug: "calm".into(),
                class_index: 0,
                position: ComponentPosition::Index(1),
            }
        );
    }

    #[tokio::test]
    async fn navigation_rolls_across_classes() {
        let api = Arc::new(RecordingApi::default());
        let mut shell = ComponentShell::load(context(&api), "calm", 0, ComponentPosition::Last)
            .await
            .unwrap();
        assert_eq!(shell.kind(), ComponentKind::AdditionalMaterials);
        assert_eq!(
            shell.navigate(Direction::Next),
            Route::Component {
                slug: "calm".into(),
                class_index: 1,
                position: ComponentPosition::Index(0),
            }
        );

        let route = shell.navigate(Direction::Next);
        let mut next = ComponentShell::open(context(&api), &route)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            next.navigate(Direction::Previous),
            Route::Component {
                slug: "calm".into(),
                class_index: 0,
                position: ComponentPosition::Last,
            }
        );
    }

    #[tokio::test]
    async fn non_video_mount_reports_start() {
        let api = Arc::new(RecordingApi::default());
        let shell = ComponentShell::load(context(&api), "calm", 0, ComponentPosition::Index(3))
            .await
            .unwrap();
        settle().await;
        assert_eq!(
            api.writes(),
            vec![WriteCall::Update(
                ComponentKind::AdditionalMaterials,
                Fraction::new(0.10).unwrap()
            )]
        );
        assert_eq!(shell.aggregate_progress(), Fraction::new(0.025).unwrap());
    }

    #[tokio::test]
    async fn mark_as_complete_routes_to_overview() {
        let api = Arc::new(RecordingApi::default());
        let mut shell = ComponentShell::load(context(&api), "calm", 0, ComponentPosition::Index(0))
            .await
            .unwrap();
        let route = shell.mark_as_complete();
        assert_eq!(route, Route::CourseOverview { slug: "calm".into() });
        settle().await;
        assert_eq!(api.writes(), vec![WriteCall::Complete(ComponentKind::Video)]);
        assert!(shell.completion_flags().contains(&(ComponentKind::Video, true)));
        assert_eq!(shell.handle_media(MediaEvent::Play), None);
    }

    fn completions(api: &RecordingApi, kind: ComponentKind) -> usize {
        api.writes()
            .iter()
            .filter(|call| **call == WriteCall::Complete(kind))
            .count()
    }

    #[tokio::test]
    async fn out_of_range_position_opens_last_component() {
        let api = Arc::new(RecordingApi::default());
        let shell = ComponentShell::load(context(&api), "calm", 1, ComponentPosition::Index(99))
            .await
            .unwrap();
        assert_eq!(shell.position(), 1);
        assert_eq!(shell.kind(), ComponentKind::KeyConcepts);
    }

    #[tokio::test]
    async fn draft_save_failure_still_completes_prompts() {
        let api = Arc::new(RecordingApi::default());
        let store = Arc::new(FlakyStore::default());
        let ctx = ShellContext::new(
            Arc::new(StaticContent::sample()),
            api.clone(),
            DraftStore::new(store.clone()),
        );
        let mut shell = ComponentShell::load(ctx, "calm", 0, ComponentPosition::Index(2))
            .await
            .unwrap();

        shell.edit_response(0, "a".repeat(25)).await.unwrap();
        store.fail_writes(true);
        let err = shell.edit_response(1, "b".repeat(25)).await.unwrap_err();
        assert!(matches!(err, ShellError::Storage(_)));

        store.fail_writes(false);
        shell.edit_response(1, "c".repeat(25)).await.unwrap();
        settle().await;

        assert_eq!(completions(&api, ComponentKind::WritingPrompts), 1);
        assert!(shell.sync().is_completed(ComponentKind::WritingPrompts));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_completion_stops_reading_timer() {
        let api = Arc::new(RecordingApi::default());
        let mut shell = ComponentShell::load(context(&api), "calm", 0, ComponentPosition::Index(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        shell.mark_as_complete();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(completions(&api, ComponentKind::KeyConcepts), 1);
        let ActiveTracker::Reading(tracker) = shell.tracker() else {
            panic!("reading tracker expected");
        };
        assert!(tracker.lock().unwrap().is_completed());
    }
}
