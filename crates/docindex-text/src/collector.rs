//! Ranked, cursor-aware top-k collection.
//!
//! Order is descending score, then ascending global doc id. A cursor keeps
//! only documents strictly after it in that order. Every match counts
//! towards `total_hits` regardless of the cursor or the page size.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tantivy::collector::{Collector, SegmentCollector};
use tantivy::{DocAddress, DocId, Score, SegmentOrdinal, SegmentReader, Searcher};

use docindex_core::types::SearchCursor;

/// Matches between interrupt checks.
const INTERRUPT_CHECK_INTERVAL: u64 = 1024;

/// Deadline and cancellation hook polled during collection.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
	deadline: Option<Instant>,
	cancelled: Option<Arc<AtomicBool>>,
}

impl Interrupt {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn with_timeout(timeout: Duration) -> Self {
		Self { deadline: Some(Instant::now() + timeout), cancelled: None }
	}

	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);
		self
	}

	/// Setting the flag to `true` stops any search carrying this interrupt.
	pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
		self.cancelled = Some(flag);
		self
	}

	pub fn is_triggered(&self) -> bool {
		self.cancelled.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
			|| self.deadline.is_some_and(|d| Instant::now() >= d)
	}
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
	pub score: Score,
	pub doc_id: u64,
	pub address: DocAddress,
}

impl Candidate {
	/// `Less` means ranked earlier.
	fn rank_cmp(&self, other: &Self) -> CmpOrdering {
		other.score.total_cmp(&self.score).then(self.doc_id.cmp(&other.doc_id))
	}

	/// Strictly later in rank order than the cursor position.
	fn is_after(&self, cursor: &SearchCursor) -> bool {
		cursor.score.total_cmp(&self.score).then(self.doc_id.cmp(&cursor.doc_id)) == CmpOrdering::Greater
	}
}

impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.rank_cmp(other) == CmpOrdering::Equal
	}
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
	fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
		Some(self.cmp(other))
	}
}

// The heap's max is the worst-ranked candidate, so it is the one evicted.
impl Ord for Candidate {
	fn cmp(&self, other: &Self) -> CmpOrdering {
		self.rank_cmp(other)
	}
}

#[derive(Debug, Default)]
pub(crate) struct Page {
	pub total_hits: u64,
	pub hits: Vec<Candidate>,
	pub interrupted: bool,
}

pub(crate) struct CursorCollector {
	limit: usize,
	after: Option<SearchCursor>,
	interrupt: Interrupt,
	segment_bases: Vec<u64>,
}

impl CursorCollector {
	pub fn new(searcher: &Searcher, limit: usize, after: Option<SearchCursor>, interrupt: Interrupt) -> Self {
		let mut base = 0u64;
		let segment_bases = searcher
			.segment_readers()
			.iter()
			.map(|r| {
				let b = base;
				base += u64::from(r.max_doc());
				b
			})
			.collect();
		Self { limit, after, interrupt, segment_bases }
	}
}

impl Collector for CursorCollector {
	type Fruit = Page;
	type Child = CursorSegmentCollector;

	fn for_segment(&self, segment_local_id: SegmentOrdinal, _segment: &SegmentReader) -> tantivy::Result<Self::Child> {
		let base = self.segment_bases.get(segment_local_id as usize).copied().unwrap_or(0);
		Ok(CursorSegmentCollector {
			segment_ord: segment_local_id,
			base,
			limit: self.limit,
			after: self.after,
			interrupt: self.interrupt.clone(),
			heap: BinaryHeap::with_capacity(self.limit.min(1024)),
			page: Page::default(),
			seen: 0,
		})
	}

	fn requires_scoring(&self) -> bool {
		true
	}

	fn merge_fruits(&self, segment_fruits: Vec<Page>) -> tantivy::Result<Page> {
		let mut merged = Page::default();
		for fruit in segment_fruits {
			merged.total_hits += fruit.total_hits;
			merged.interrupted |= fruit.interrupted;
			merged.hits.extend(fruit.hits);
		}
		merged.hits.sort();
		merged.hits.truncate(self.limit);
		Ok(merged)
	}
}

pub(crate) struct CursorSegmentCollector {
	segment_ord: SegmentOrdinal,
	base: u64,
	limit: usize,
	after: Option<SearchCursor>,
	interrupt: Interrupt,
	heap: BinaryHeap<Candidate>,
	page: Page,
	seen: u64,
}

impl SegmentCollector for CursorSegmentCollector {
	type Fruit = Page;

	fn collect(&mut self, doc: DocId, score: Score) {
		if self.page.interrupted { return; }
		self.seen += 1;
		if self.seen % INTERRUPT_CHECK_INTERVAL == 0 && self.interrupt.is_triggered() {
			self.page.interrupted = true;
			return;
		}
		self.page.total_hits += 1;

		let candidate = Candidate { score, doc_id: self.base + u64::from(doc), address: DocAddress::new(self.segment_ord, doc) };
		if self.after.as_ref().is_some_and(|c| !candidate.is_after(c)) { return; }
		if self.limit == 0 { return; }
		if self.heap.len() < self.limit {
			self.heap.push(candidate);
		} else if self.heap.peek().is_some_and(|worst| candidate < *worst) {
			self.heap.pop();
			self.heap.push(candidate);
		}
	}

	fn harvest(self) -> Page {
		let mut page = self.page;
		page.hits = self.heap.into_vec();
		page
	}
}
