//! Per-record feature accumulation
//!
//! Events are folded one at a time through [`AccumulatorState::step`], which
//! reconstructs the edit, updates pause timers, chunk buffers and the caret,
//! and returns the samples the event produced. [`FeatureAccumulator`] collects
//! those samples into a [`FeatureSet`].

use crate::config::{ExtractorConfig, SameSnapshotPolicy};
use crate::error::{EditError, ExtractError};
use crate::writing::chunk::{Adjacency, DeletionChunk, InsertionChunk};
use crate::writing::classify::OperationClassifier;
use crate::writing::diff::EditionDiffer;
use crate::writing::pause::PauseTracker;
use crate::writing::types::{DiffRange, FeatureSet, KeystrokeEvent, Operation, Sample, WritingRecord};
use crate::writing::words::WordCounter;

/// Running state between two events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorState {
    snapshot: Vec<char>,
    /// Caret after the last edit, in that edit's snapshot; -1 before the first character
    last_position: isize,
    last_timestamp: Option<i64>,
    pauses: PauseTracker,
    insertion: InsertionChunk,
    deletion: DeletionChunk,
}

impl Default for AccumulatorState {
    fn default() -> Self {
        Self {
            snapshot: Vec::new(),
            last_position: -1,
            last_timestamp: None,
            pauses: PauseTracker::default(),
            insertion: InsertionChunk::default(),
            deletion: DeletionChunk::default(),
        }
    }
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: AccumulatorState,
    pub samples: Vec<Sample>,
}

impl AccumulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_position(&self) -> isize {
        self.last_position
    }

    pub fn deletion(&self) -> &DeletionChunk {
        &self.deletion
    }

    /// Apply event number `index` and return the new state with its samples
    pub fn step(
        mut self,
        index: usize,
        event: &KeystrokeEvent,
        config: &ExtractorConfig,
    ) -> Result<Step, ExtractError> {
        let cur: Vec<char> = event.snapshot.chars().collect();
        let range = EditionDiffer::diff(&self.snapshot, &cur).map_err(|e| e.at_event(index))?;
        let class = OperationClassifier::classify(&range).map_err(|e| e.at_event(index))?;

        let now = event.timestamp_ms;
        let elapsed = self.last_timestamp.map_or(0, |t| now.saturating_sub(t));
        let long_pause = elapsed >= config.long_pause_ms;
        let mut samples = Vec::new();

        log::trace!(
            "event {}: {:?} range {} selection={}",
            index,
            class.operation,
            range,
            class.has_selection
        );

        match class.operation {
            Operation::Same => match config.same_snapshot {
                SameSnapshotPolicy::Reject => {
                    return Err(EditError::Unsupported(range).at_event(index));
                }
                SameSnapshotPolicy::Skip => {
                    self.last_timestamp = Some(now);
                    return Ok(Step {
                        state: self,
                        samples,
                    });
                }
            },
            Operation::Insert => {
                if class.has_selection {
                    self.pauses.reset();
                    self.insertion.discard();
                }
                self.apply_insert(&cur, &range, now, elapsed, long_pause, &mut samples);
            }
            Operation::Delete => {
                self.pauses.reset();
                self.apply_delete(&range, now, elapsed, &mut samples);
            }
        }

        self.last_position = range.caret();
        self.last_timestamp = Some(now);
        self.snapshot = cur;

        Ok(Step {
            state: self,
            samples,
        })
    }

    fn apply_insert(
        &mut self,
        cur: &[char],
        range: &DiffRange,
        now: i64,
        elapsed: i64,
        long_pause: bool,
        samples: &mut Vec<Sample>,
    ) {
        // A deletion run cannot span an insertion
        samples.extend(self.deletion.flush(now));

        let inserted = cur[range.s2];
        let current = range.caret();

        if current != self.last_position + 1 {
            self.pauses.reset();
            self.insertion.discard();
            if current < self.last_position {
                samples.push(self.jump(range, elapsed));
            }
        } else if long_pause {
            let preceding: String = self.snapshot[..range.s1].iter().collect();
            samples.extend(self.insertion.restart(inserted, now, preceding));
        } else {
            self.insertion.append(inserted);
        }

        samples.extend(self.pauses.on_insert(inserted, now));
    }

    fn apply_delete(&mut self, range: &DiffRange, now: i64, elapsed: i64, samples: &mut Vec<Sample>) {
        // An insertion burst cannot span a deletion
        self.insertion.discard();

        if range.caret() < self.last_position {
            samples.push(self.jump(range, elapsed));
        }

        let removed: String = self.snapshot[range.s1..range.e1].iter().collect();
        let preceding: String = self.snapshot[..range.s1].iter().collect();
        let subsequent: String = self.snapshot[range.e1..].iter().collect();
        let adjacency = Adjacency::of(range.s1, range.e1, self.last_position);

        samples.extend(
            self.deletion
                .absorb(&removed, adjacency, &preceding, &subsequent, now),
        );
    }

    /// Jump sample for a caret moved back from `last_position` to the edit in `range`.
    ///
    /// The skipped span runs from the end of the edited region in the previous
    /// snapshot through the previous caret.
    fn jump(&self, range: &DiffRange, elapsed: i64) -> Sample {
        let end = usize::try_from(self.last_position + 1)
            .unwrap_or(0)
            .min(self.snapshot.len());
        let words = if range.e1 < end {
            let skipped: String = self.snapshot[range.e1..end].iter().collect();
            let preceding: String = self.snapshot[..range.e1].iter().collect();
            let subsequent: String = self.snapshot[end..].iter().collect();
            WordCounter::count_jump_words(&skipped, &preceding, &subsequent)
        } else {
            0
        };
        Sample::Jump {
            words,
            elapsed_ms: elapsed,
        }
    }
}

/// Collects samples from successive transitions for a single record
#[derive(Debug, Default)]
pub struct FeatureAccumulator {
    config: ExtractorConfig,
    state: AccumulatorState,
    within_word: Vec<i64>,
    between_word: Vec<i64>,
    between_sentence: Vec<i64>,
    between_paragraph: Vec<i64>,
    deletions: Vec<(usize, i64)>,
    insertion_chunks: Vec<(usize, i64)>,
    jumps: Vec<(usize, i64)>,
}

impl FeatureAccumulator {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current transition state
    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    /// Feed event number `index`.
    ///
    /// After an error the accumulator must be discarded.
    pub fn push(&mut self, index: usize, event: &KeystrokeEvent) -> Result<(), ExtractError> {
        let state = std::mem::take(&mut self.state);
        let step = state.step(index, event, &self.config)?;
        self.state = step.state;
        for sample in step.samples {
            self.record(sample);
        }
        Ok(())
    }

    fn record(&mut self, sample: Sample) {
        match sample {
            Sample::WithinWordPause(ms) => self.within_word.push(ms),
            Sample::BetweenWordPause(ms) => self.between_word.push(ms),
            Sample::BetweenSentencePause(ms) => self.between_sentence.push(ms),
            Sample::BetweenParagraphPause(ms) => self.between_paragraph.push(ms),
            Sample::Deletion { words, duration_ms } => self.deletions.push((words, duration_ms)),
            Sample::InsertionChunk { words, duration_ms } => {
                self.insertion_chunks.push((words, duration_ms))
            }
            Sample::Jump { words, elapsed_ms } => self.jumps.push((words, elapsed_ms)),
        }
    }

    /// Assemble the feature set. Chunk and jump samples without words are dropped.
    pub fn finish(self, record: &WritingRecord) -> FeatureSet {
        let first_event = record.events.first().map(|e| e.timestamp_ms);

        let (deletion_lengths, deletion_times) = retain_nonzero(self.deletions);
        let (insertion_chunk_lengths, insertion_chunk_times) = retain_nonzero(self.insertion_chunks);
        let (jump_lengths, jump_times) = retain_nonzero(self.jumps);

        FeatureSet {
            score: record.score,
            total_time_ms: first_event.map(|first| record.submit_ms.saturating_sub(first)),
            planning_time_ms: first_event.map(|first| first.saturating_sub(record.session_start_ms)),
            word_count: WordCounter::count_words(&record.final_text),
            within_word_pauses: self.within_word,
            between_word_pauses: self.between_word,
            between_sentence_pauses: self.between_sentence,
            between_paragraph_pauses: self.between_paragraph,
            deletion_lengths,
            deletion_times,
            insertion_chunk_count: insertion_chunk_lengths.len(),
            insertion_chunk_lengths,
            insertion_chunk_times,
            jump_count: jump_lengths.len(),
            jump_times,
            jump_lengths,
        }
    }
}

fn retain_nonzero(samples: Vec<(usize, i64)>) -> (Vec<usize>, Vec<i64>) {
    samples.into_iter().filter(|(words, _)| *words > 0).unzip()
}

/// Extract the feature set of one record. Any malformed event aborts the record.
pub fn extract(record: &WritingRecord, config: &ExtractorConfig) -> Result<FeatureSet, ExtractError> {
    let mut accumulator = FeatureAccumulator::new(config.clone());
    for (index, event) in record.events.iter().enumerate() {
        accumulator.push(index, event)?;
    }
    Ok(accumulator.finish(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(final_text: &str, events: &[(i64, &str)]) -> WritingRecord {
        WritingRecord {
            final_text: final_text.to_string(),
            score: 3,
            session_start_ms: 0,
            submit_ms: 100_000,
            events: events
                .iter()
                .map(|(t, s)| KeystrokeEvent::new(*t, *s))
                .collect(),
        }
    }

    /// Events typing `text` one character at a time, `step` ms apart
    fn typing(text: &str, start: i64, step: i64) -> Vec<(i64, String)> {
        let chars: Vec<char> = text.chars().collect();
        (1..=chars.len())
            .map(|n| (start + (n as i64 - 1) * step, chars[..n].iter().collect()))
            .collect()
    }

    fn run(final_text: &str, events: &[(i64, String)]) -> Result<FeatureSet, ExtractError> {
        let borrowed: Vec<(i64, &str)> = events.iter().map(|(t, s)| (*t, s.as_str())).collect();
        extract(&record(final_text, &borrowed), &ExtractorConfig::default())
    }

    #[test]
    fn test_empty_event_list() {
        let features = extract(&record("Hello, world!", &[]), &ExtractorConfig::default()).unwrap();
        assert_eq!(
            features,
            FeatureSet {
                score: 3,
                word_count: 2,
                ..FeatureSet::default()
            }
        );
        assert_eq!(features.total_time_ms, None);
        assert_eq!(features.planning_time_ms, None);
    }

    #[test]
    fn test_session_times() {
        let mut rec = record("a", &[(3000, "a")]);
        rec.session_start_ms = 1000;
        rec.submit_ms = 10_000;
        let features = extract(&rec, &ExtractorConfig::default()).unwrap();
        assert_eq!(features.planning_time_ms, Some(2000));
        assert_eq!(features.total_time_ms, Some(7000));
    }

    #[test]
    fn test_long_gap_inside_word_is_one_within_word_pause() {
        let features = run("ab", &[(0, "a".into()), (2500, "ab".into())]).unwrap();
        assert_eq!(features.within_word_pauses, vec![2500]);
        assert!(features.between_word_pauses.is_empty());
        assert!(features.between_sentence_pauses.is_empty());
        assert!(features.between_paragraph_pauses.is_empty());
    }

    #[test]
    fn test_pause_categories_from_typing() {
        let events = typing("Hi. Yo\nOk so", 0, 100);
        let features = run("Hi. Yo\nOk so", &events).unwrap();
        // H i . _ Y o \n O k _ s o
        // within: i, o, k, o ; sentence: Y ; paragraph: O ; word: s
        assert_eq!(features.within_word_pauses, vec![100, 100, 100, 100]);
        assert_eq!(features.between_sentence_pauses, vec![300]);
        assert_eq!(features.between_paragraph_pauses, vec![200]);
        assert_eq!(features.between_word_pauses, vec![200]);
    }

    #[test]
    fn test_backward_relocation_emits_one_jump() {
        let mut events = typing("ab cd", 0, 100);
        events.push((1000, "xab cd".to_string()));
        let features = run("xab cd", &events).unwrap();

        assert_eq!(features.jump_count, 1);
        assert_eq!(features.jump_lengths, vec![2]);
        assert_eq!(features.jump_times, vec![600]);
    }

    #[test]
    fn test_jump_into_middle_of_word_drops_fragment() {
        let mut events = typing("ab cd", 0, 100);
        events.push((1000, "axb cd".to_string()));
        let features = run("axb cd", &events).unwrap();

        // skipped "b cd" starts mid-word
        assert_eq!(features.jump_lengths, vec![1]);
        assert_eq!(features.jump_times, vec![600]);
    }

    #[test]
    fn test_backspace_run_is_one_deletion_chunk() {
        let mut events = typing("hello world", 0, 100);
        for (i, text) in ["hello worl", "hello wor", "hello wo", "hello w", "hello ", "hello"]
            .iter()
            .enumerate()
        {
            events.push((1100 + i as i64 * 100, text.to_string()));
        }
        events.push((1700, "hello!".to_string()));

        let features = run("hello!", &events).unwrap();
        assert_eq!(features.deletion_lengths, vec![1]);
        assert_eq!(features.deletion_times, vec![600]);
        // backspacing moves the caret back but skips nothing
        assert_eq!(features.jump_count, 0);
        assert_eq!(features.within_word_pauses.len(), 8);
        assert_eq!(features.between_word_pauses, vec![200]);
    }

    #[test]
    fn test_insertion_chunks_split_on_long_pauses() {
        let events = vec![
            (0, "a".to_string()),
            (100, "ab".to_string()),
            (2200, "ab ".to_string()),
            (2300, "ab c".to_string()),
            (2400, "ab cd".to_string()),
            (5000, "ab cde".to_string()),
        ];
        let features = run("ab cde", &events).unwrap();

        assert_eq!(features.insertion_chunk_count, 1);
        assert_eq!(features.insertion_chunk_lengths, vec![1]);
        assert_eq!(features.insertion_chunk_times, vec![2800]);
        assert_eq!(features.within_word_pauses, vec![100, 100, 2600]);
        assert_eq!(features.between_word_pauses, vec![2200]);
    }

    #[test]
    fn test_selection_replacement_breaks_continuity() {
        let mut events = typing("abc", 0, 100);
        events.push((300, "ax".to_string()));
        events.push((400, "axy".to_string()));
        let features = run("axy", &events).unwrap();

        // "x" replaced a selection, so no pause is measured into it
        assert_eq!(features.within_word_pauses, vec![100, 100, 100]);
        assert_eq!(features.jump_count, 0);
    }

    #[test]
    fn test_prefix_deletion_moves_caret_before_start() {
        let events = vec![
            (0, "a".to_string()),
            (100, "ab".to_string()),
            (200, "b".to_string()),
            (300, "cb".to_string()),
        ];
        let rec_events: Vec<(i64, &str)> = events.iter().map(|(t, s)| (*t, s.as_str())).collect();
        let rec = record("cb", &rec_events);

        let mut acc = FeatureAccumulator::new(ExtractorConfig::default());
        for (i, event) in rec.events.iter().take(3).enumerate() {
            acc.push(i, event).unwrap();
        }
        assert_eq!(acc.state().last_position(), -1);
        assert!(acc.state().deletion().is_open());

        acc.push(3, &rec.events[3]).unwrap();
        assert!(!acc.state().deletion().is_open());
        let features = acc.finish(&rec);
        // "a" was cut from the front of the word "ab"
        assert!(features.deletion_lengths.is_empty());
    }

    #[test]
    fn test_detached_deletion_keeps_run_context() {
        let mut events = typing("ab x cd", 0, 100);
        events.push((700, "ab x c".to_string()));
        events.push((800, "ab  c".to_string()));
        events.push((900, "ab y c".to_string()));
        let features = run("ab y c", &events).unwrap();

        // both removals are scored against the context of the first one,
        // where each is a fragment of a longer word
        assert!(features.deletion_lengths.is_empty());
        assert!(features.deletion_times.is_empty());
    }

    #[test]
    fn test_deletion_behind_caret_emits_jump() {
        let mut events = typing("ab x cd", 0, 100);
        events.push((700, "ab x c".to_string()));
        events.push((800, "ab  c".to_string()));
        let features = run("ab  c", &events).unwrap();

        // the caret moved back over " c" to remove "x"
        assert_eq!(features.jump_count, 1);
        assert_eq!(features.jump_lengths, vec![1]);
        assert_eq!(features.jump_times, vec![100]);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut rec = record("ab", &[(i64::MIN, "a"), (i64::MAX, "ab")]);
        rec.session_start_ms = i64::MAX;
        rec.submit_ms = i64::MIN;
        let features = extract(&rec, &ExtractorConfig::default()).unwrap();

        assert_eq!(features.planning_time_ms, Some(i64::MIN));
        assert_eq!(features.total_time_ms, Some(0));
        assert_eq!(features.within_word_pauses, vec![i64::MAX]);
    }

    #[test]
    fn test_two_simultaneous_changes_fail_with_malformed_diff() {
        let mut events = typing("abcd", 0, 100);
        events.push((500, "xbcy".to_string()));
        let err = run("xbcy", &events).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDiff { index: 4, .. }));
    }

    #[test]
    fn test_paste_is_unsupported() {
        let mut events = typing("ab", 0, 100);
        events.push((500, "ab pasted".to_string()));
        let err = run("ab pasted", &events).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedOperation { index: 2, .. }));
    }

    #[test]
    fn test_unchanged_snapshot_policy() {
        let events = vec![(0, "a"), (100, "a"), (200, "ab")];

        let err = extract(&record("ab", &events), &ExtractorConfig::default()).unwrap_err();
        assert_eq!(err.event_index(), Some(1));

        let config = ExtractorConfig {
            same_snapshot: SameSnapshotPolicy::Skip,
            ..ExtractorConfig::default()
        };
        let features = extract(&record("ab", &events), &config).unwrap();
        assert_eq!(features.within_word_pauses, vec![200]);
    }

    #[test]
    fn test_step_is_a_pure_transition() {
        let config = ExtractorConfig::default();
        let state = AccumulatorState::new();

        let step = state
            .step(0, &KeystrokeEvent::new(0, "a"), &config)
            .unwrap();
        assert!(step.samples.is_empty());
        assert_eq!(step.state.last_position(), 0);

        let before = step.state.clone();
        let next = step
            .state
            .step(1, &KeystrokeEvent::new(150, "ab"), &config)
            .unwrap();
        assert_eq!(next.samples, vec![Sample::WithinWordPause(150)]);
        assert_eq!(next.state.last_position(), 1);
        // the input state is untouched
        assert_eq!(before.last_position(), 0);
    }
}
