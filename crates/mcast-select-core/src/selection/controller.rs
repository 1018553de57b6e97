//! Selection controller.
//!
//! Drives the "add devices to multicast group" view: choosing a source,
//! loading pages with their membership probes, row and select-all toggles,
//! and turning the selection into a request for the group mutation service.
//!
//! All state is owned here and mutated through `&mut self`. Membership probes
//! are detached futures; their outcomes come back through
//! [`SelectionController::on_lookup_complete`] in whatever order they resolve.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{SessionOptions, SubmitStrategy};
use crate::error::{CoreError, SelectionError, ServiceError};
use crate::fanout::{Completion, FanOutBarrier, Generation};
use crate::membership::MembershipStatusCache;
use crate::service::{
    is_eligible_source, ApplicationDirectory, DeviceDirectory, MembershipService,
    MulticastGroupService,
};
use crate::types::{Application, Device, DeviceFilter, DeviceId, GroupId, SourceId};

use super::set::{SelectionMode, SelectionSet};

/// Answer of one membership probe, tagged with the batch it belongs to.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub generation: Generation,
    pub device: DeviceId,
    pub result: Result<bool, ServiceError>,
}

/// Lookups a page load still has to run.
#[derive(Debug)]
pub struct PageBatch {
    pub generation: Generation,
    /// Ids with no cached answer, one entry per id.
    pub lookups: Vec<DeviceId>,
    /// Set when every id was already answered and the batch drained at once.
    pub refresh: Option<PageRefresh>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Joined,
    NotJoined,
    Unknown,
}

/// Checkbox state of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowState {
    pub device: DeviceId,
    pub membership: Membership,
    pub checked: bool,
    /// Joined rows cannot be toggled.
    pub disabled: bool,
}

/// Tri-state "select all" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAllState {
    pub checked: bool,
    pub indeterminate: bool,
}

/// One coalesced re-render of the current page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRefresh {
    #[serde(skip)]
    pub generation: Generation,
    pub rows: Vec<RowState>,
    pub select_all: SelectAllState,
    /// Probes of this batch that failed; their rows show `Unknown`.
    #[serde(skip)]
    pub failures: Vec<ServiceError>,
}

/// A page fetched from the device directory together with its refresh.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub devices: Vec<Device>,
    pub total_count: usize,
    pub refresh: PageRefresh,
}

/// Request handed to the group mutation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    AddDevices {
        group: GroupId,
        devices: Vec<DeviceId>,
    },
    AddSourceDevices {
        group: GroupId,
        application: SourceId,
        exceptions: Vec<DeviceId>,
    },
}

struct ActiveSource {
    selection: SelectionSet,
    /// Every id observed for this source across loaded pages.
    known: BTreeSet<DeviceId>,
    /// Device count of the source, from an unfiltered listing.
    total: Option<usize>,
    page: Vec<DeviceId>,
    failures: Vec<ServiceError>,
}

impl ActiveSource {
    fn new(source: SourceId) -> Self {
        Self {
            selection: SelectionSet::new(source),
            known: BTreeSet::new(),
            total: None,
            page: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn is_fully_enumerated(&self) -> bool {
        self.total.is_some_and(|total| self.known.len() >= total)
    }
}

enum ControllerState {
    NoSourceChosen,
    SourceChosen(ActiveSource),
}

pub struct SelectionController<M> {
    cache: MembershipStatusCache<M>,
    barrier: FanOutBarrier,
    state: ControllerState,
    options: SessionOptions,
}

impl<M> SelectionController<M>
where
    M: MembershipService + 'static,
{
    pub fn new(membership: Arc<M>, group: GroupId, options: SessionOptions) -> Self {
        Self {
            cache: MembershipStatusCache::new(membership, group),
            barrier: FanOutBarrier::new(),
            state: ControllerState::NoSourceChosen,
            options,
        }
    }

    pub fn group(&self) -> &GroupId {
        self.cache.group()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn cache(&self) -> &MembershipStatusCache<M> {
        &self.cache
    }

    pub fn source(&self) -> Option<SourceId> {
        match &self.state {
            ControllerState::NoSourceChosen => None,
            ControllerState::SourceChosen(active) => Some(active.selection.source()),
        }
    }

    pub fn selection(&self) -> Option<&SelectionSet> {
        match &self.state {
            ControllerState::NoSourceChosen => None,
            ControllerState::SourceChosen(active) => Some(&active.selection),
        }
    }

    /// Ids observed for the current source so far.
    pub fn known_devices(&self) -> Result<&BTreeSet<DeviceId>, SelectionError> {
        Ok(&self.active()?.known)
    }

    pub fn is_fully_enumerated(&self) -> bool {
        match &self.state {
            ControllerState::NoSourceChosen => false,
            ControllerState::SourceChosen(active) => active.is_fully_enumerated(),
        }
    }

    /// Start selecting from `source` with a fresh selection.
    ///
    /// Membership answers are kept: they depend on the group, not the source.
    /// Lookups still in flight for the previous page will populate the cache
    /// but no longer refresh anything.
    pub fn choose_source(&mut self, source: SourceId) {
        self.barrier.abandon();
        self.state = ControllerState::SourceChosen(ActiveSource::new(source));
        info!(group = %self.group(), application = %source, "source chosen");
    }

    /// Choose `source` after checking it shares the group's service profile.
    pub async fn choose_eligible_source<A>(
        &mut self,
        applications: &A,
        source: SourceId,
    ) -> Result<Application, CoreError>
    where
        A: ApplicationDirectory,
    {
        let group = applications.get_group(self.group()).await?;
        let application = applications
            .list_applications(None)
            .await?
            .into_iter()
            .find(|a| a.id == source)
            .ok_or_else(|| ServiceError::NotFound(format!("application {}", source)))?;

        if !is_eligible_source(&application, &group) {
            return Err(SelectionError::IneligibleSource {
                application: source,
                group: group.id,
            }
            .into());
        }

        self.choose_source(source);
        Ok(application)
    }

    /// Record how many devices the current source holds.
    pub fn record_source_total(&mut self, total: usize) -> Result<(), SelectionError> {
        self.active_mut()?.total = Some(total);
        Ok(())
    }

    /// A page of `ids` was loaded: open a batch and work out which ids need a probe.
    ///
    /// Ids already answered, and repeats within the page, complete immediately.
    pub fn on_page_loaded(&mut self, ids: &[DeviceId]) -> Result<PageBatch, SelectionError> {
        let active = self.active_mut()?;
        active.page = ids.to_vec();
        active.failures.clear();
        active.known.extend(ids.iter().cloned());

        let generation = self.barrier.open(ids.len());
        let mut lookups = Vec::new();
        let mut seen = BTreeSet::new();
        let mut drained = ids.is_empty();

        for id in ids {
            let first = seen.insert(id.clone());
            if first && self.cache.get(id).is_none() {
                lookups.push(id.clone());
                continue;
            }

            // Counts are exact here, so overuse cannot happen.
            if let Ok(Completion::Drained) = self.barrier.complete(generation) {
                drained = true;
            }
        }

        debug!(
            generation = generation.value(),
            devices = ids.len(),
            lookups = lookups.len(),
            "page loaded"
        );

        let refresh = if drained {
            Some(self.refresh(generation))
        } else {
            None
        };

        Ok(PageBatch {
            generation,
            lookups,
            refresh,
        })
    }

    /// Membership probe for `id`, tagged with `generation`.
    pub fn lookup(
        &self,
        generation: Generation,
        id: DeviceId,
    ) -> impl Future<Output = LookupOutcome> + Send + 'static {
        self.cache
            .lookup(id)
            .map(move |(device, result)| LookupOutcome {
                generation,
                device,
                result,
            })
    }

    /// Feed back one probe answer.
    ///
    /// Returns the page refresh when this answer drained the current batch.
    /// Answers of superseded batches still fill the cache.
    pub fn on_lookup_complete(
        &mut self,
        outcome: LookupOutcome,
    ) -> Result<Option<PageRefresh>, CoreError> {
        let LookupOutcome {
            generation,
            device,
            result,
        } = outcome;
        let current = generation == self.barrier.current();

        match result {
            Ok(joined) => {
                self.cache.record(device, joined);
            }
            Err(e) => {
                warn!(device = %device, error = %e, "membership lookup failed");
                if current {
                    if let ControllerState::SourceChosen(active) = &mut self.state {
                        active.failures.push(e);
                    }
                }
            }
        }

        match self.barrier.complete(generation)? {
            Completion::Drained => Ok(Some(self.refresh(generation))),
            Completion::Pending { .. } => Ok(None),
            Completion::Stale => {
                debug!(generation = generation.value(), "stale lookup completion");
                Ok(None)
            }
        }
    }

    /// Load `ids` as the current page and run its probes to completion.
    pub async fn load_ids(&mut self, ids: &[DeviceId]) -> Result<PageRefresh, CoreError> {
        let batch = self.on_page_loaded(ids)?;
        if let Some(refresh) = batch.refresh {
            return Ok(refresh);
        }

        let generation = batch.generation;
        let probes: Vec<_> = batch
            .lookups
            .into_iter()
            .map(|id| self.lookup(generation, id))
            .collect();
        let mut outcomes =
            stream::iter(probes).buffer_unordered(self.options.lookup_concurrency.max(1));

        let mut refresh = None;
        while let Some(outcome) = outcomes.next().await {
            if let Some(drained) = self.on_lookup_complete(outcome)? {
                refresh = Some(drained);
            }
        }

        Ok(refresh.unwrap_or_else(|| self.refresh(generation)))
    }

    /// Fetch page `page` of the current source and load it.
    pub async fn load_page<D>(
        &mut self,
        directory: &D,
        page: usize,
        search: Option<&str>,
    ) -> Result<LoadedPage, CoreError>
    where
        D: DeviceDirectory,
    {
        let source = self.active()?.selection.source();
        let filter = DeviceFilter::new(source, self.options.page_size.max(1))
            .with_search(search.map(str::to_string))
            .page(page);

        let listing = directory
            .list_devices(&filter)
            .await
            .map_err(|e| match e {
                ServiceError::PageLoadFailed { .. } => e,
                other => ServiceError::PageLoadFailed {
                    application: source,
                    message: other.to_string(),
                },
            })?;

        // Filtered counts say nothing about the whole source.
        if filter.search.is_none() {
            self.record_source_total(listing.total_count)?;
        }

        let ids = listing.ids();
        let refresh = self.load_ids(&ids).await?;

        Ok(LoadedPage {
            devices: listing.devices,
            total_count: listing.total_count,
            refresh,
        })
    }

    /// Load every page of the current source.
    ///
    /// `on_page` receives the number of devices loaded so far and the total.
    pub async fn load_all_pages<D, F>(
        &mut self,
        directory: &D,
        search: Option<&str>,
        mut on_page: F,
    ) -> Result<Vec<Device>, CoreError>
    where
        D: DeviceDirectory,
        F: FnMut(usize, usize),
    {
        let mut devices = Vec::new();
        let mut page = 0;

        loop {
            let loaded = self.load_page(directory, page, search).await?;
            let fetched = loaded.devices.len();
            devices.extend(loaded.devices);
            on_page(devices.len(), loaded.total_count);

            if fetched == 0 || devices.len() >= loaded.total_count {
                break;
            }
            page += 1;
        }

        Ok(devices)
    }

    /// Row click on `id` leaving it `checked`. Joined devices are rejected.
    pub fn on_toggle_row(&mut self, id: &DeviceId, checked: bool) -> Result<(), SelectionError> {
        if self.cache.is_joined(id) {
            warn!(device = %id, "rejected toggle of joined device");
            return Err(SelectionError::InvalidToggle { device: id.clone() });
        }

        self.active_mut()?.selection.toggle(id, checked);
        Ok(())
    }

    /// Click on the select-all box. An indeterminate box counts as enabling.
    pub fn on_toggle_select_all(&mut self, checked: bool) -> Result<(), SelectionError> {
        let selection = &mut self.active_mut()?.selection;
        let enabled = checked || selection.is_indeterminate();
        selection.set_select_all(enabled);
        Ok(())
    }

    /// Current rows and select-all state, without waiting on a batch.
    pub fn rows(&self) -> Result<(Vec<RowState>, SelectAllState), SelectionError> {
        let active = self.active()?;
        Ok((self.row_states(active), select_all_state(&active.selection)))
    }

    /// The devices a submit would add, resolved against what is known.
    pub fn submit(&self) -> Result<BTreeSet<DeviceId>, SelectionError> {
        let active = self.active()?;
        let selected = active
            .selection
            .materialize(&active.known, &self.cache.joined());

        if selected.is_empty() {
            return Err(SelectionError::EmptySelection);
        }
        Ok(selected)
    }

    /// Turn the selection into a mutation request.
    pub fn plan(&self, strategy: SubmitStrategy) -> Result<Submission, SelectionError> {
        let active = self.active()?;
        let group = self.group().clone();
        let source = active.selection.source();

        match (active.selection.mode(), strategy) {
            (SelectionMode::Explicit, _) => Ok(Submission::AddDevices {
                group,
                devices: self.submit()?.into_iter().collect(),
            }),
            (SelectionMode::Complement, SubmitStrategy::Materialize) => {
                if !active.is_fully_enumerated() {
                    return Err(SelectionError::IncompleteEnumeration {
                        application: source,
                        known: active.known.len(),
                    });
                }
                Ok(Submission::AddDevices {
                    group,
                    devices: self.submit()?.into_iter().collect(),
                })
            }
            (SelectionMode::Complement, SubmitStrategy::ForwardComplement) => {
                if active.is_fully_enumerated() {
                    self.submit()?;
                }
                Ok(Submission::AddSourceDevices {
                    group,
                    application: source,
                    exceptions: active.selection.exceptions().iter().cloned().collect(),
                })
            }
        }
    }

    /// Plan and send the selection. A successful submit clears the selection.
    pub async fn submit_to<G>(
        &mut self,
        groups: &G,
        strategy: SubmitStrategy,
    ) -> Result<Submission, CoreError>
    where
        G: MulticastGroupService,
    {
        let submission = self.plan(strategy)?;

        let result = match &submission {
            Submission::AddDevices { group, devices } => groups.add_devices(group, devices).await,
            Submission::AddSourceDevices {
                group,
                application,
                exceptions,
            } => {
                groups
                    .add_source_devices(group, *application, exceptions)
                    .await
            }
        };

        if let Err(e) = result {
            warn!(group = %self.group(), error = %e, "submit failed");
            return Err(match e {
                ServiceError::SubmitFailed { .. } => e,
                other => ServiceError::SubmitFailed {
                    group: self.group().clone(),
                    message: other.to_string(),
                },
            }
            .into());
        }

        let active = self.active_mut()?;
        let source = active.selection.source();
        active.selection.reset_for_source(source);
        info!(group = %self.group(), application = %source, "devices submitted");

        Ok(submission)
    }

    fn active(&self) -> Result<&ActiveSource, SelectionError> {
        match &self.state {
            ControllerState::NoSourceChosen => Err(SelectionError::NoSourceChosen),
            ControllerState::SourceChosen(active) => Ok(active),
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveSource, SelectionError> {
        match &mut self.state {
            ControllerState::NoSourceChosen => Err(SelectionError::NoSourceChosen),
            ControllerState::SourceChosen(active) => Ok(active),
        }
    }

    fn row_states(&self, active: &ActiveSource) -> Vec<RowState> {
        active
            .page
            .iter()
            .map(|id| {
                let membership = match self.cache.get(id) {
                    Some(true) => Membership::Joined,
                    Some(false) => Membership::NotJoined,
                    None => Membership::Unknown,
                };
                let joined = membership == Membership::Joined;

                RowState {
                    device: id.clone(),
                    membership,
                    checked: joined || active.selection.is_checked(id, true),
                    disabled: joined,
                }
            })
            .collect()
    }

    fn refresh(&mut self, generation: Generation) -> PageRefresh {
        let failures = match &mut self.state {
            ControllerState::NoSourceChosen => Vec::new(),
            ControllerState::SourceChosen(active) => std::mem::take(&mut active.failures),
        };

        let (rows, select_all) = match &self.state {
            ControllerState::NoSourceChosen => (Vec::new(), SelectAllState::default()),
            ControllerState::SourceChosen(active) => {
                (self.row_states(active), select_all_state(&active.selection))
            }
        };

        PageRefresh {
            generation,
            rows,
            select_all,
            failures,
        }
    }
}

fn select_all_state(selection: &SelectionSet) -> SelectAllState {
    SelectAllState {
        checked: selection.is_all_checked(),
        indeterminate: selection.is_indeterminate(),
    }
}
