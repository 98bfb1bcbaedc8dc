/*!
 * Pipeline driver: runs a batch through a filter and an ordered list of steps.
 *
 * Failures are caught per item. A failing item is reported, the steps are
 * told to drop its state, and the batch goes on with the next item.
 */

use log::{debug, error, info, warn};
use std::time::Instant;

use super::batch::{Batch, BatchItem, BatchItemContext, BatchItemResult, BatchReport};
use super::cancel::CancellationToken;
use super::Step;
use crate::errors::{PipelineError, StepError};
use crate::filters::{Filter, FilterGuard};
use crate::locale::LocaleId;
use crate::resource::Event;

/// Outcome of reading one item
struct ItemRun {
    events: usize,
    cancelled: bool,
}

/// Ordered chain of steps
#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step, builder style
    pub fn with_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_step(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First step of the given concrete type
    pub fn step<T: Step + 'static>(&self) -> Option<&T> {
        self.steps.iter().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// First step of the given concrete type, mutable
    pub fn step_mut<T: Step + 'static>(&mut self) -> Option<&mut T> {
        self.steps.iter_mut().find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Process a whole batch
    ///
    /// # Arguments
    /// * `batch` - Items with their locales and roots
    /// * `filter` - Filter reading every item
    ///
    /// # Returns
    /// * `Result<BatchReport, PipelineError>` - Per item results; only start or end of batch failures are errors
    pub fn process_batch(&mut self, batch: &Batch, filter: &mut dyn Filter) -> Result<BatchReport, PipelineError> {
        self.process_batch_with(batch, filter, |_| {})
    }

    /// Process a whole batch, calling `on_item` after each item
    pub fn process_batch_with<F>(
        &mut self,
        batch: &Batch,
        filter: &mut dyn Filter,
        mut on_item: F,
    ) -> Result<BatchReport, PipelineError>
    where
        F: FnMut(&BatchItemResult),
    {
        let start_time = Instant::now();
        self.set_locales(&batch.source_locale, batch.target_locale.as_ref());
        for step in self.steps.iter_mut() {
            step.start_batch()?;
        }
        info!("Processing {} item(s) through {} step(s)", batch.len(), self.steps.len());

        let mut report = BatchReport::default();
        for (index, item) in batch.items.iter().enumerate() {
            let result = self.process_item(batch, index, item, filter);
            on_item(&result);
            report.items.push(result);
        }

        for step in self.steps.iter_mut() {
            step.end_batch()?;
        }
        report.duration = start_time.elapsed();
        info!("Batch done. {}", report.summary());
        Ok(report)
    }

    fn set_locales(&mut self, source: &LocaleId, target: Option<&LocaleId>) {
        for step in self.steps.iter_mut() {
            step.set_source_locale(source);
            step.set_target_locale(target);
        }
    }

    fn process_item(
        &mut self,
        batch: &Batch,
        index: usize,
        item: &BatchItem,
        filter: &mut dyn Filter,
    ) -> BatchItemResult {
        let start_time = Instant::now();
        let name = item.display_name();
        let document = batch.raw_document(item);
        let mut context = BatchItemContext {
            index,
            name: name.clone(),
            source_locale: document.source_locale().clone(),
            target_locale: document.target_locale().cloned(),
            output_path: batch.output_path(item),
            output_encoding: batch.output_encoding.clone(),
            writer: Some(filter.create_skeleton_writer()),
            document,
        };
        debug!("Item {}: {}", index + 1, name);

        match self.run_item(&mut context, filter) {
            Ok(run) => {
                if run.cancelled {
                    debug!("Item {} was cancelled after {} events", name, run.events);
                }
                BatchItemResult::success(index, &name, run.events, run.cancelled, start_time.elapsed())
            }
            Err(e) => {
                error!("Item {} failed: {}", name, e);
                for step in self.steps.iter_mut() {
                    step.cancel();
                }
                BatchItemResult::failure(index, &name, &e.to_string(), start_time.elapsed())
            }
        }
    }

    fn run_item(&mut self, context: &mut BatchItemContext, filter: &mut dyn Filter) -> Result<ItemRun, StepError> {
        for step in self.steps.iter_mut() {
            step.start_batch_item(context)?;
        }

        let token = CancellationToken::new();
        let mut run = ItemRun {
            events: 0,
            cancelled: false,
        };
        {
            let mut guard = FilterGuard::open(filter, &context.document)?;
            while guard.has_next()? {
                if !run.cancelled && (token.is_cancelled() || self.steps.iter().any(|s| s.is_done())) {
                    debug!("Cancelling filter {} for {}", guard.name(), context.name);
                    token.cancel();
                    guard.cancel();
                    run.cancelled = true;
                }
                let event = guard.next()?;
                run.events += 1;
                self.dispatch(0, event, &token)?;
            }
        }

        for step in self.steps.iter_mut() {
            step.end_batch_item()?;
        }
        Ok(run)
    }

    /// Pass an event through the steps from `first` on
    fn dispatch(&mut self, first: usize, event: Event, token: &CancellationToken) -> Result<(), StepError> {
        let mut event = event;
        for k in first..self.steps.len() {
            event = self.steps[k].handle(event, token)?;
            match event {
                Event::NoOp => return Ok(()),
                Event::Multi(events) => {
                    for inner in events {
                        self.dispatch(k + 1, inner, token)?;
                    }
                    return Ok(());
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run the events of an already extracted document through the steps
    ///
    /// Used when events do not come from a filter, e.g. parts produced by the
    /// document splitter. Lifecycle calls are left to the caller.
    pub fn process_events(&mut self, events: Vec<Event>) -> Result<(), StepError> {
        let token = CancellationToken::new();
        for event in events {
            if token.is_cancelled() {
                warn!("Event list cancelled, remaining events dropped");
                break;
            }
            self.dispatch(0, event, &token)?;
        }
        Ok(())
    }

    /// Destroy every step
    pub fn destroy(&mut self) {
        for step in self.steps.iter_mut() {
            step.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::LineFilter;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records which step saw which event
    #[derive(Debug)]
    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        done_after: Option<usize>,
        seen: usize,
    }

    impl Step for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn handle(&mut self, event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
            self.seen += 1;
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.label, event.id().unwrap_or("-")));
            Ok(event)
        }

        fn is_done(&self) -> bool {
            self.done_after.is_some_and(|n| self.seen >= n)
        }

        fn start_batch_item(&mut self, _context: &mut BatchItemContext) -> Result<(), StepError> {
            self.seen = 0;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn recorder(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn Step> {
        Box::new(Recorder {
            label,
            log: Rc::clone(log),
            done_after: None,
            seen: 0,
        })
    }

    fn batch(items: Vec<BatchItem>) -> Batch {
        let mut batch = Batch::new(LocaleId::new("en").unwrap(), None);
        for item in items {
            batch.add(item);
        }
        batch
    }

    #[test]
    fn test_pipeline_shouldPassEachEventThroughStepsInOrder() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new()
            .with_step(recorder("a", &log))
            .with_step(recorder("b", &log));
        let report = pipeline
            .process_batch(&batch(vec![BatchItem::from_text("t", "x\ny")]), &mut LineFilter::new())
            .unwrap();
        assert!(report.is_success());
        assert_eq!(
            *log.borrow(),
            vec!["a:doc1", "b:doc1", "a:tu1", "b:tu1", "a:tu2", "b:tu2", "a:doc1e", "b:doc1e"]
        );
    }

    #[test]
    fn test_pipeline_failingItem_shouldNotAbortBatch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new().with_step(recorder("a", &log));
        let items = vec![
            BatchItem::from_path("/nonexistent/tkit/missing.txt", "UTF-8"),
            BatchItem::from_text("ok", "fine"),
        ];
        let report = pipeline.process_batch(&batch(items), &mut LineFilter::new()).unwrap();
        assert_eq!(report.items.len(), 2);
        assert!(!report.items[0].success);
        assert!(report.items[0].error.as_deref().unwrap_or("").contains("Malformed input"));
        assert!(report.items[1].success);
        assert_eq!(report.items[1].events, 3);
    }

    #[test]
    fn test_pipeline_doneStep_shouldCancelFilter() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new().with_step(Box::new(Recorder {
            label: "a",
            log: Rc::clone(&log),
            done_after: Some(2),
            seen: 0,
        }));
        let report = pipeline
            .process_batch(&batch(vec![BatchItem::from_text("t", "1\n2\n3\n4")]), &mut LineFilter::new())
            .unwrap();
        assert!(report.items[0].success);
        assert!(report.items[0].cancelled);
        assert_eq!(*log.borrow(), vec!["a:doc1", "a:tu1", "a:doc1e"]);
    }

    #[test]
    fn test_pipeline_step_shouldDowncast() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = Pipeline::new().with_step(recorder("a", &log));
        assert_eq!(pipeline.step::<Recorder>().map(|r| r.label), Some("a"));
    }
}
