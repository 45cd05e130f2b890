use unloop_core::CollectionStatus;

/// Cursor state of one pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerState {
    /// No page requested yet.
    Start,
    /// Previous page offered this cursor.
    Next(String),
    Done(CollectionStatus),
}

/// Explicit pagination state machine, finite by `max_pages`.
///
/// The pager never performs I/O: the caller asks it which cursor to request
/// next, performs the request, and reports back with [`Pager::advance`] or
/// [`Pager::fail`]. A fresh pager restarts from the first page.
#[derive(Debug, Clone)]
pub struct Pager {
    state: PagerState,
    pages_fetched: usize,
    max_pages: usize,
}

impl Pager {
    pub fn new(max_pages: usize) -> Self {
        let state = if max_pages == 0 {
            PagerState::Done(CollectionStatus::PageLimit)
        } else {
            PagerState::Start
        };
        Self {
            state,
            pages_fetched: 0,
            max_pages,
        }
    }

    /// Cursor for the next request: `Some(None)` for the first page,
    /// `Some(Some(c))` afterwards, `None` once pagination is over.
    pub fn next_cursor(&self) -> Option<Option<String>> {
        match &self.state {
            PagerState::Start => Some(None),
            PagerState::Next(cursor) => Some(Some(cursor.clone())),
            PagerState::Done(_) => None,
        }
    }

    /// Records a successful page and the cursor it offered.
    pub fn advance(&mut self, next: Option<String>) {
        if self.is_done() {
            return;
        }
        self.pages_fetched += 1;
        self.state = match next.filter(|c| !c.is_empty()) {
            None => PagerState::Done(CollectionStatus::Complete),
            Some(_) if self.pages_fetched >= self.max_pages => {
                PagerState::Done(CollectionStatus::PageLimit)
            }
            Some(cursor) => PagerState::Next(cursor),
        };
    }

    pub fn fail(&mut self, cause: impl Into<String>) {
        if !self.is_done() {
            self.state = PagerState::Done(CollectionStatus::Failed(cause.into()));
        }
    }

    pub fn cancel(&mut self) {
        if !self.is_done() {
            self.state = PagerState::Done(CollectionStatus::Cancelled);
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, PagerState::Done(_))
    }

    pub fn state(&self) -> &PagerState {
        &self.state
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Final status; `None` while pages remain.
    pub fn status(&self) -> Option<&CollectionStatus> {
        match &self.state {
            PagerState::Done(status) => Some(status),
            _ => None,
        }
    }
}
