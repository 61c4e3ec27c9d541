//! Replacement registration and replay
//!
//! Transforms register `[start, end]` token ranges against one stream.
//! Replay walks the stream once: a registered, still-applicable start hands
//! its whole span to the owner's `optimize` callback, everything else is
//! copied through the printer. Requests are consumed in ascending start
//! order whatever order they were registered in.

use super::lookup::{IndexedLookup, LinearLookup, LookupStrategy, StartLookup};
use super::ReplaceError;
use crate::config::compile_time::replacement::INITIAL_REQUEST_CAPACITY;
use crate::printer::TokenPrinter;

/// Position of an owner in the slice handed to replay
pub type OwnerId = usize;

/// Producer of replacement text for the ranges it registered
pub trait ReplacementOwner {
    /// Late veto evaluated at replay time
    fn optimize_possible(&self, _param: usize) -> bool {
        true
    }

    /// Print the replacement for tokens `start..=end`
    fn optimize(&mut self, printer: &mut TokenPrinter<'_>, param: usize, start: usize, end: usize);

    fn has_trailer(&self) -> bool {
        false
    }

    /// Generated content emitted once after the main body
    fn emit_trailer(&mut self, _printer: &mut TokenPrinter<'_>) {}

    /// Drop per-pass state
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementRequest {
    pub start: usize,
    pub end: usize,
    pub owner: OwnerId,
    /// Opaque value handed back to the owner
    pub param: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub replaced: usize,
    pub replaced_tokens: usize,
    pub vetoed: usize,
    pub copied_tokens: usize,
    pub tails: usize,
    pub trailers: usize,
}

#[derive(Debug, Default)]
pub struct RangeReplacer {
    /// Start offsets parallel to `requests`
    starts: Vec<usize>,
    requests: Vec<ReplacementRequest>,
    tails: Vec<(usize, usize)>,
    selection: Option<(usize, usize)>,
    strategy: Option<LookupStrategy>,
}

impl RangeReplacer {
    pub fn new() -> Self {
        Self {
            starts: Vec::with_capacity(INITIAL_REQUEST_CAPACITY),
            requests: Vec::with_capacity(INITIAL_REQUEST_CAPACITY),
            ..Self::default()
        }
    }

    /// Force a lookup strategy instead of choosing by request count
    pub fn with_strategy(mut self, strategy: LookupStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn strategy(&self) -> LookupStrategy {
        self.strategy
            .unwrap_or_else(|| LookupStrategy::for_request_count(self.requests.len()))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[ReplacementRequest] {
        &self.requests
    }

    pub fn tails(&self) -> &[(usize, usize)] {
        &self.tails
    }

    pub fn is_start_registered(&self, start: usize) -> bool {
        self.starts.contains(&start)
    }

    /// Restrict replacements to spans inside `[first, last]`
    pub fn set_selection(&mut self, selection: Option<(usize, usize)>) {
        self.selection = selection;
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// Register `start..=end` for `owner`
    ///
    /// `end == None` is the no-op sentinel and stores nothing. `end < start`
    /// is a transform bug and fails.
    pub fn register_range(
        &mut self,
        owner: OwnerId,
        start: usize,
        end: Option<usize>,
        param: usize,
    ) -> Result<(), ReplaceError> {
        let Some(end) = end else {
            return Ok(());
        };
        if end < start {
            return Err(ReplaceError::InvalidRange { start, end });
        }

        self.starts.push(start);
        self.requests.push(ReplacementRequest {
            start,
            end,
            owner,
            param,
        });
        Ok(())
    }

    /// Move the first request registered as exactly `old` to `new`
    ///
    /// Returns whether a request was found.
    pub fn rebind_range(
        &mut self,
        old: (usize, usize),
        new: (usize, usize),
    ) -> Result<bool, ReplaceError> {
        if new.1 < new.0 {
            return Err(ReplaceError::InvalidRange {
                start: new.0,
                end: new.1,
            });
        }

        let found = self
            .requests
            .iter()
            .position(|r| (r.start, r.end) == old);
        if let Some(idx) = found {
            self.requests[idx].start = new.0;
            self.requests[idx].end = new.1;
            self.starts[idx] = new.0;
        }
        Ok(found.is_some())
    }

    /// Queue `start..=end` for verbatim copy after the main body
    pub fn register_trailer(&mut self, start: usize, end: usize) -> Result<(), ReplaceError> {
        if end < start {
            return Err(ReplaceError::InvalidRange { start, end });
        }
        self.tails.push((start, end));
        Ok(())
    }

    fn validate<O: ReplacementOwner + ?Sized>(
        &self,
        owners: &[Box<O>],
        token_count: usize,
    ) -> Result<(), ReplaceError> {
        for request in &self.requests {
            if request.owner >= owners.len() {
                return Err(ReplaceError::UnknownOwner {
                    owner: request.owner,
                    owners: owners.len(),
                });
            }
            if request.end >= token_count {
                return Err(ReplaceError::OutOfBounds {
                    start: request.start,
                    end: request.end,
                    len: token_count,
                });
            }
        }
        for &(start, end) in &self.tails {
            if end >= token_count {
                return Err(ReplaceError::OutOfBounds {
                    start,
                    end,
                    len: token_count,
                });
            }
        }
        Ok(())
    }

    fn in_selection(&self, request: &ReplacementRequest) -> bool {
        match self.selection {
            Some((first, last)) => request.start >= first && request.end <= last,
            None => true,
        }
    }

    /// Replay tokens `first..=last`, then tails, then owner trailers
    pub fn replay<O: ReplacementOwner + ?Sized>(
        &self,
        owners: &mut [Box<O>],
        printer: &mut TokenPrinter<'_>,
        first: usize,
        last: usize,
    ) -> Result<ReplayStats, ReplaceError> {
        let token_count = printer.stream().len();
        self.validate(owners, token_count)?;

        let strategy = self.strategy();
        let lookup: Box<dyn StartLookup + '_> = match strategy {
            LookupStrategy::Linear => Box::new(LinearLookup::new(&self.starts)),
            LookupStrategy::Indexed => Box::new(IndexedLookup::new(&self.starts)),
        };

        let mut stats = ReplayStats::default();
        let last = last.min(token_count.saturating_sub(1));
        let mut offset = first;

        while token_count > 0 && offset <= last {
            if let Some(idx) = lookup.request_at(offset) {
                let request = self.requests[idx];
                let owner = &mut owners[request.owner];
                if self.in_selection(&request) && owner.optimize_possible(request.param) {
                    printer.begin_replacement(request.start);
                    owner.optimize(printer, request.param, request.start, request.end);
                    stats.replaced += 1;
                    stats.replaced_tokens += request.end - request.start + 1;
                    offset = request.end + 1;
                } else {
                    stats.vetoed += 1;
                    stats.copied_tokens += 1;
                    printer.print_token(offset);
                    offset += 1;
                }
                continue;
            }

            let stop = match lookup.next_start_after(offset) {
                Some(next) => (next - 1).min(last),
                None => last,
            };
            printer.print_range(offset, stop, false);
            stats.copied_tokens += stop - offset + 1;
            offset = stop + 1;
        }

        for &(start, end) in &self.tails {
            printer.flush();
            printer.print_range(start, end, false);
            stats.tails += 1;
        }

        let mut seen: Vec<OwnerId> = Vec::new();
        for request in &self.requests {
            if seen.contains(&request.owner) {
                continue;
            }
            seen.push(request.owner);
            let owner = &mut owners[request.owner];
            if owner.has_trailer() {
                owner.emit_trailer(printer);
                stats.trailers += 1;
            }
        }

        log_debug!("Replay finished",
            "strategy" => format!("{:?}", strategy),
            "requests" => self.requests.len(),
            "replaced" => stats.replaced,
            "vetoed" => stats.vetoed,
            "copied_tokens" => stats.copied_tokens);

        Ok(stats)
    }

    /// Forget all requests and reset every owner
    pub fn wipeout<O: ReplacementOwner + ?Sized>(&mut self, owners: &mut [Box<O>]) {
        self.starts.clear();
        self.requests.clear();
        self.tails.clear();
        self.selection = None;
        for owner in owners.iter_mut() {
            owner.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use crate::printer::{PrintOptions, StringSink};
    use crate::tokens::TokenStream;
    use assert_matches::assert_matches;

    #[derive(Default)]
    struct Recorder {
        label: &'static str,
        calls: Vec<(usize, usize, usize)>,
        veto: bool,
        trailer: bool,
        resets: usize,
    }

    impl Recorder {
        fn new(label: &'static str) -> Box<Self> {
            Box::new(Self {
                label,
                ..Self::default()
            })
        }
    }

    impl ReplacementOwner for Recorder {
        fn optimize_possible(&self, _param: usize) -> bool {
            !self.veto
        }

        fn optimize(&mut self, printer: &mut TokenPrinter<'_>, param: usize, start: usize, end: usize) {
            self.calls.push((param, start, end));
            printer.print_str(self.label);
        }

        fn has_trailer(&self) -> bool {
            self.trailer
        }

        fn emit_trailer(&mut self, printer: &mut TokenPrinter<'_>) {
            printer.flush();
            printer.print_str(&format!("trailer-{}", self.label));
        }

        fn reset(&mut self) {
            self.resets += 1;
            self.calls.clear();
        }
    }

    /// One token per line: t0 .. t{n-1}
    fn numbered_stream(n: usize) -> TokenStream {
        let source: Vec<String> = (0..n).map(|i| format!("t{}", i)).collect();
        tokenize_str(&source.join("\n")).unwrap()
    }

    fn run(
        replacer: &RangeReplacer,
        owners: &mut [Box<Recorder>],
        stream: &TokenStream,
    ) -> (Vec<String>, ReplayStats) {
        let mut sink = StringSink::new();
        let stats = {
            let mut printer = TokenPrinter::new(stream, &mut sink, PrintOptions::default());
            let stats = replacer
                .replay(owners, &mut printer, 0, stream.len() - 1)
                .unwrap();
            printer.finish().unwrap();
            stats
        };
        (sink.as_str().lines().map(str::to_string).collect(), stats)
    }

    fn expected(ranges: &[(usize, usize)], fill: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for (i, &(a, b)) in ranges.iter().enumerate() {
            out.extend((a..=b).map(|t| format!("t{}", t)));
            if let Some(label) = fill.get(i) {
                out.push(label.to_string());
            }
        }
        out
    }

    #[test]
    fn test_two_transforms_splice_in_order() {
        let stream = numbered_stream(51);
        let mut owners = vec![Recorder::new("X"), Recorder::new("Y")];
        let mut replacer = RangeReplacer::new();
        // Registration order does not matter
        replacer.register_range(1, 30, Some(40), 7).unwrap();
        replacer.register_range(0, 10, Some(20), 3).unwrap();

        let (lines, stats) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, expected(&[(0, 9), (21, 29), (41, 50)], &["X", "Y"]));
        assert_eq!(owners[0].calls, vec![(3, 10, 20)]);
        assert_eq!(owners[1].calls, vec![(7, 30, 40)]);
        assert_eq!(stats.replaced, 2);
        assert_eq!(stats.copied_tokens, 51 - 11 - 11);
        assert_eq!(stats.copied_tokens + stats.replaced_tokens, 51);
    }

    #[test]
    fn test_sentinel_is_noop() {
        let stream = numbered_stream(8);
        let mut owners = vec![Recorder::new("X")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 3, None, 0).unwrap();
        assert!(replacer.is_empty());

        let (lines, stats) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, expected(&[(0, 7)], &[]));
        assert_eq!(stats, ReplayStats {
            copied_tokens: 8,
            ..ReplayStats::default()
        });
    }

    #[test]
    fn test_invalid_range_fails_fast() {
        let mut replacer = RangeReplacer::new();
        let result = replacer.register_range(0, 8, Some(3), 0);
        assert_matches!(result, Err(ReplaceError::InvalidRange { start: 8, end: 3 }));
        assert_matches!(
            replacer.register_trailer(5, 4),
            Err(ReplaceError::InvalidRange { .. })
        );
    }

    #[test]
    fn test_out_of_bounds_and_unknown_owner() {
        let stream = numbered_stream(5);
        let mut sink = StringSink::new();
        let mut printer = TokenPrinter::new(&stream, &mut sink, PrintOptions::default());
        let mut owners = vec![Recorder::new("X")];

        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 2, Some(9), 0).unwrap();
        assert_matches!(
            replacer.replay(&mut owners, &mut printer, 0, 4),
            Err(ReplaceError::OutOfBounds { end: 9, len: 5, .. })
        );

        let mut replacer = RangeReplacer::new();
        replacer.register_range(3, 1, Some(2), 0).unwrap();
        assert_matches!(
            replacer.replay(&mut owners, &mut printer, 0, 4),
            Err(ReplaceError::UnknownOwner { owner: 3, owners: 1 })
        );
    }

    #[test]
    fn test_veto_falls_through_to_copy() {
        let stream = numbered_stream(6);
        let mut vetoing = Recorder::new("X");
        vetoing.veto = true;
        let mut owners = vec![vetoing, Recorder::new("Y")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 1, Some(3), 0).unwrap();
        // Starts inside the vetoed span still apply
        replacer.register_range(1, 2, Some(2), 0).unwrap();

        let (lines, stats) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, vec!["t0", "t1", "Y", "t3", "t4", "t5"]);
        assert!(owners[0].calls.is_empty());
        assert_eq!(stats.vetoed, 1);
        assert_eq!(stats.replaced, 1);
    }

    #[test]
    fn test_selection_filter_requires_containment() {
        let stream = numbered_stream(30);
        let mut owners = vec![Recorder::new("A"), Recorder::new("B")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 2, Some(4), 0).unwrap();
        replacer.register_range(1, 10, Some(20), 0).unwrap();
        replacer.set_selection(Some((0, 15)));

        let (lines, stats) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, expected(&[(0, 1), (5, 29)], &["A"]));
        assert!(owners[1].calls.is_empty());
        assert_eq!(stats.vetoed, 1);
    }

    #[test]
    fn test_nested_start_is_skipped() {
        let stream = numbered_stream(12);
        let mut owners = vec![Recorder::new("OUTER"), Recorder::new("INNER")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(1, 4, Some(6), 0).unwrap();
        replacer.register_range(0, 2, Some(8), 0).unwrap();

        let (lines, _) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, expected(&[(0, 1), (9, 11)], &["OUTER"]));
        assert!(owners[1].calls.is_empty());
    }

    #[test]
    fn test_lookup_strategies_produce_identical_replays() {
        let stream = numbered_stream(200);
        let build = |strategy| {
            let mut replacer = RangeReplacer::new().with_strategy(strategy);
            // 50 two-token spans, registered back to front
            for k in (0..50).rev() {
                replacer.register_range(k % 2, k * 4, Some(k * 4 + 1), k).unwrap();
            }
            replacer
        };

        let linear = build(LookupStrategy::Linear);
        let indexed = build(LookupStrategy::Indexed);
        assert_eq!(RangeReplacer::new().strategy(), LookupStrategy::Linear);
        assert!(linear.len() > crate::config::compile_time::replacement::INDEX_THRESHOLD);

        let mut owners_a = vec![Recorder::new("E"), Recorder::new("O")];
        let mut owners_b = vec![Recorder::new("E"), Recorder::new("O")];
        let (lines_a, stats_a) = run(&linear, &mut owners_a, &stream);
        let (lines_b, stats_b) = run(&indexed, &mut owners_b, &stream);
        assert_eq!(lines_a, lines_b);
        assert_eq!(stats_a, stats_b);
        assert_eq!(stats_a.replaced, 50);
        assert_eq!(owners_a[0].calls, owners_b[0].calls);
    }

    #[test]
    fn test_rebind_range() {
        let stream = numbered_stream(10);
        let mut owners = vec![Recorder::new("X")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 2, Some(3), 0).unwrap();
        assert!(replacer.rebind_range((2, 3), (2, 6)).unwrap());
        assert!(!replacer.rebind_range((1, 1), (1, 2)).unwrap());
        assert_matches!(
            replacer.rebind_range((2, 6), (6, 2)),
            Err(ReplaceError::InvalidRange { .. })
        );

        let (lines, _) = run(&replacer, &mut owners, &stream);
        assert_eq!(lines, expected(&[(0, 1), (7, 9)], &["X"]));
    }

    #[test]
    fn test_tails_then_trailers_in_order() {
        let stream = numbered_stream(10);
        let mut first = Recorder::new("B");
        first.trailer = true;
        let mut second = Recorder::new("A");
        second.trailer = true;
        let mut owners = vec![second, first];

        let mut replacer = RangeReplacer::new();
        replacer.register_range(1, 1, Some(1), 0).unwrap();
        replacer.register_range(0, 3, Some(3), 0).unwrap();
        replacer.register_range(1, 5, Some(5), 0).unwrap();
        replacer.register_trailer(8, 8).unwrap();
        replacer.register_trailer(0, 0).unwrap();
        replacer.register_trailer(4, 4).unwrap();

        let (lines, stats) = run(&replacer, &mut owners, &stream);
        let tail = &lines[lines.len() - 5..];
        assert_eq!(tail, ["t8", "t0", "t4", "trailer-B", "trailer-A"]);
        assert_eq!(stats.tails, 3);
        assert_eq!(stats.trailers, 2);
    }

    #[test]
    fn test_wipeout_resets_owners() {
        let mut owners = vec![Recorder::new("X"), Recorder::new("Y")];
        let mut replacer = RangeReplacer::new();
        replacer.register_range(0, 0, Some(1), 0).unwrap();
        replacer.register_trailer(2, 3).unwrap();
        replacer.set_selection(Some((0, 1)));

        replacer.wipeout(&mut owners);
        assert!(replacer.is_empty());
        assert!(replacer.tails().is_empty());
        assert_eq!(replacer.selection(), None);
        assert!(owners.iter().all(|o| o.resets == 1));
    }
}
