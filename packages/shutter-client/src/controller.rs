use std::{
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use shutter_domain::{DateRange, ImagePayload, SearchInput, request::normalize_query};

use crate::{ClientRequest, ClientSearchState, SearchBackend, SearchStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
	QueryChanged(String),
	ImageUploaded(ImagePayload),
	ThresholdChanged(f32),
	PageChanged(u32),
	DateRangeChanged(DateRange),
	Submit,
}

/// How an event reaches the backend. Only query and threshold changes can be debounced; every
/// other event is applied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
	Debounced,
	Immediate,
}

#[derive(Debug, Default)]
struct PendingIntent {
	query: Option<String>,
	threshold: Option<f32>,
}
impl PendingIntent {
	fn is_empty(&self) -> bool {
		self.query.is_none() && self.threshold.is_none()
	}
}

struct ControllerState {
	view: ClientSearchState,
	pending: PendingIntent,
	timer: Option<JoinHandle<()>>,
	/// Bumped on every dispatch. A timer only flushes if it still holds the latest value.
	generation: u64,
}

struct Inner {
	backend: Arc<dyn SearchBackend>,
	debounce: Duration,
	state: Mutex<ControllerState>,
	tx: watch::Sender<ClientSearchState>,
}

/// Single owner of the active search.
///
/// Every dispatched request gets the next sequence id. A completion is rendered only when its id
/// is still the latest one, so a slow response can never overwrite a newer search. The debounce
/// timer is a task that a newer debounced event aborts. In-flight requests run to completion and
/// are discarded by id.
///
/// Must be driven from within a tokio runtime.
pub struct SearchController {
	inner: Arc<Inner>,
}
impl SearchController {
	pub fn new(backend: Arc<dyn SearchBackend>, debounce: Duration, threshold: f32) -> Self {
		let view = ClientSearchState::new(threshold.clamp(0.0, 1.0));
		let (tx, _) = watch::channel(view.clone());
		let state = ControllerState {
			view,
			pending: PendingIntent::default(),
			timer: None,
			generation: 0,
		};

		Self { inner: Arc::new(Inner { backend, debounce, state: Mutex::new(state), tx }) }
	}

	pub fn subscribe(&self) -> watch::Receiver<ClientSearchState> {
		self.inner.tx.subscribe()
	}

	pub fn state(&self) -> ClientSearchState {
		self.inner.tx.borrow().clone()
	}

	pub fn dispatch(&self, event: SearchEvent, trigger: Trigger) {
		let debounced = trigger == Trigger::Debounced
			&& matches!(event, SearchEvent::QueryChanged(_) | SearchEvent::ThresholdChanged(_));
		let mut state = self.inner.lock();

		if let Some(timer) = state.timer.take() {
			timer.abort();
		}

		state.generation += 1;

		if debounced {
			match event {
				SearchEvent::QueryChanged(query) => state.pending.query = Some(query),
				SearchEvent::ThresholdChanged(threshold) =>
					state.pending.threshold = Some(threshold),
				_ => {},
			}

			let inner = self.inner.clone();
			let generation = state.generation;

			state.timer = Some(tokio::spawn(async move {
				tokio::time::sleep(inner.debounce).await;
				inner.flush_pending(generation);
			}));

			return;
		}

		let pending = std::mem::take(&mut state.pending);

		apply_pending(&mut state.view, pending);
		apply_event(&mut state.view, event);
		self.inner.launch(&mut state);
	}

	pub fn on_query_change(&self, query: impl Into<String>) {
		self.dispatch(SearchEvent::QueryChanged(query.into()), Trigger::Debounced);
	}

	pub fn on_image_upload(&self, image: ImagePayload) {
		self.dispatch(SearchEvent::ImageUploaded(image), Trigger::Immediate);
	}

	pub fn on_threshold_change(&self, threshold: f32) {
		self.dispatch(SearchEvent::ThresholdChanged(threshold), Trigger::Debounced);
	}

	pub fn on_page_change(&self, page: u32) {
		self.dispatch(SearchEvent::PageChanged(page), Trigger::Immediate);
	}

	pub fn on_date_range_change(&self, date_range: DateRange) {
		self.dispatch(SearchEvent::DateRangeChanged(date_range), Trigger::Immediate);
	}

	pub fn submit(&self) {
		self.dispatch(SearchEvent::Submit, Trigger::Immediate);
	}
}
impl Drop for SearchController {
	fn drop(&mut self) {
		if let Some(timer) = self.inner.lock().timer.take() {
			timer.abort();
		}
	}
}

impl Inner {
	fn lock(&self) -> MutexGuard<'_, ControllerState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn flush_pending(self: &Arc<Self>, generation: u64) {
		let mut state = self.lock();

		// An abort cannot stop a timer already waiting on the lock; a newer dispatch owns `timer`.
		if state.generation != generation {
			return;
		}

		state.timer = None;

		// An immediate event may have consumed the intent while this timer was waking up.
		if state.pending.is_empty() {
			return;
		}

		let pending = std::mem::take(&mut state.pending);

		apply_pending(&mut state.view, pending);
		self.launch(&mut state);
	}

	fn launch(self: &Arc<Self>, state: &mut ControllerState) {
		let view = &mut state.view;

		view.active_request_id += 1;

		let request_id = view.active_request_id;
		let Some(request) = build_request(view) else {
			tracing::debug!(request_id, "Nothing to search for. Clearing results.");

			view.status = SearchStatus::Idle;
			view.results = None;
			view.error = None;

			self.tx.send_replace(view.clone());

			return;
		};

		tracing::debug!(
			request_id,
			mode = request.mode().as_str(),
			page = request.page,
			"Dispatching search."
		);

		view.status = SearchStatus::Searching;
		view.error = None;

		self.tx.send_replace(view.clone());

		let inner = self.clone();

		tokio::spawn(async move {
			let result = inner.backend.search(&request).await;

			inner.complete(request_id, result);
		});
	}

	fn complete(&self, request_id: u64, result: crate::Result<shutter_domain::PageEnvelope>) {
		let mut state = self.lock();
		let view = &mut state.view;

		if request_id != view.active_request_id {
			tracing::debug!(
				request_id,
				active_request_id = view.active_request_id,
				"Discarding superseded response."
			);

			return;
		}

		match result {
			Ok(envelope) => {
				view.status = SearchStatus::Idle;
				view.results = Some(envelope);
				view.error = None;
			},
			Err(err) => {
				tracing::warn!(request_id, error = %err, "Search failed.");

				view.status = SearchStatus::Error;
				view.error = Some(err.to_string());
			},
		}

		self.tx.send_replace(view.clone());
	}
}

fn apply_pending(view: &mut ClientSearchState, pending: PendingIntent) {
	if let Some(query) = pending.query {
		apply_event(view, SearchEvent::QueryChanged(query));
	}
	if let Some(threshold) = pending.threshold {
		apply_event(view, SearchEvent::ThresholdChanged(threshold));
	}
}

fn apply_event(view: &mut ClientSearchState, event: SearchEvent) {
	match event {
		SearchEvent::QueryChanged(query) => {
			view.query = normalize_query(&query);
			view.image = None;
			view.page = 1;
		},
		SearchEvent::ImageUploaded(image) => {
			view.image = Some(image);
			view.query.clear();
			view.page = 1;
		},
		SearchEvent::ThresholdChanged(threshold) =>
			if threshold.is_finite() {
				view.threshold = threshold.clamp(0.0, 1.0);
			},
		SearchEvent::PageChanged(page) => view.page = page.max(1),
		SearchEvent::DateRangeChanged(date_range) => {
			view.date_range = date_range;
			view.page = 1;
		},
		SearchEvent::Submit => {},
	}
}

fn build_request(view: &ClientSearchState) -> Option<ClientRequest> {
	let input = match (&view.image, view.query.is_empty()) {
		(Some(image), _) => SearchInput::Image(image.clone()),
		(None, false) => SearchInput::Text(view.query.clone()),
		(None, true) => return None,
	};

	Some(ClientRequest {
		input,
		threshold: view.threshold,
		date_range: view.date_range,
		page: view.page,
	})
}
