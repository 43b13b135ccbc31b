//! Lazy document streams
//!
//! A [`Stream`] wraps a [`DocumentIterator`] and pulls documents from it only
//! while the consumer keeps asking. Operators (filter, limit, offset) wrap
//! the iterator; nothing is buffered.
//!
//! Every visitor returns [`Control`]: `Continue`, `Stop`, or an error. A
//! `Stop` ends the traversal and is reported as success.

use crate::document::{Document, FieldBuffer};
use crate::errors::DbResult;

/// Outcome of one visitor call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep going
    Continue,
    /// End the traversal early; not an error
    Stop,
}

/// Per-document visitor
pub type DocumentVisitor<'v> = dyn FnMut(&dyn Document) -> DbResult<Control> + 'v;

/// A source of documents that can be traversed, possibly many times.
pub trait DocumentIterator {
    /// Calls `visit` for every document in order.
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()>;
}

impl<T: DocumentIterator + ?Sized> DocumentIterator for &T {
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        (**self).iterate(visit)
    }
}

/// A lazy, restartable sequence of documents.
pub struct Stream<'a> {
    it: Option<Box<dyn DocumentIterator + 'a>>,
}

impl<'a> Stream<'a> {
    /// Creates a stream over `it`
    pub fn new(it: impl DocumentIterator + 'a) -> Self {
        Self {
            it: Some(Box::new(it)),
        }
    }

    /// A stream with no documents
    pub fn empty() -> Self {
        Self { it: None }
    }

    /// Traverses the stream. Returns `Ok(())` on exhaustion and on `Stop`.
    pub fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        match &self.it {
            Some(it) => it.iterate(visit),
            None => Ok(()),
        }
    }

    /// Keeps only documents for which `pred` returns true.
    pub fn filter<F>(self, pred: F) -> Stream<'a>
    where
        F: Fn(&dyn Document) -> DbResult<bool> + 'a,
    {
        self.wrap(|inner| FilterIterator { inner, pred })
    }

    /// Yields at most `n` documents, then stops the upstream traversal.
    pub fn limit(self, n: usize) -> Stream<'a> {
        self.wrap(|inner| LimitIterator { inner, n })
    }

    /// Skips the first `n` documents.
    pub fn offset(self, n: usize) -> Stream<'a> {
        self.wrap(|inner| OffsetIterator { inner, n })
    }

    /// Counts the documents.
    pub fn count(&self) -> DbResult<usize> {
        let mut n = 0;
        self.iterate(&mut |_| {
            n += 1;
            Ok(Control::Continue)
        })?;
        Ok(n)
    }

    /// Returns a copy of the first document, if any.
    pub fn first(&self) -> DbResult<Option<FieldBuffer>> {
        let mut found = None;
        self.iterate(&mut |d| {
            found = Some(FieldBuffer::from_document(d)?);
            Ok(Control::Stop)
        })?;
        Ok(found)
    }

    /// Materializes every document.
    pub fn collect_buffers(&self) -> DbResult<Vec<FieldBuffer>> {
        let mut docs = Vec::new();
        self.iterate(&mut |d| {
            docs.push(FieldBuffer::from_document(d)?);
            Ok(Control::Continue)
        })?;
        Ok(docs)
    }

    fn wrap<I, F>(self, f: F) -> Stream<'a>
    where
        I: DocumentIterator + 'a,
        F: FnOnce(Box<dyn DocumentIterator + 'a>) -> I,
    {
        match self.it {
            Some(inner) => Stream::new(f(inner)),
            None => Stream::empty(),
        }
    }
}

struct FilterIterator<'a, F> {
    inner: Box<dyn DocumentIterator + 'a>,
    pred: F,
}

impl<F> DocumentIterator for FilterIterator<'_, F>
where
    F: Fn(&dyn Document) -> DbResult<bool>,
{
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        self.inner.iterate(&mut |d| {
            if (self.pred)(d)? {
                visit(d)
            } else {
                Ok(Control::Continue)
            }
        })
    }
}

struct LimitIterator<'a> {
    inner: Box<dyn DocumentIterator + 'a>,
    n: usize,
}

impl DocumentIterator for LimitIterator<'_> {
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        if self.n == 0 {
            return Ok(());
        }
        let mut seen = 0;
        self.inner.iterate(&mut |d| {
            seen += 1;
            let control = visit(d)?;
            if seen >= self.n {
                return Ok(Control::Stop);
            }
            Ok(control)
        })
    }
}

struct OffsetIterator<'a> {
    inner: Box<dyn DocumentIterator + 'a>,
    n: usize,
}

impl DocumentIterator for OffsetIterator<'_> {
    fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
        let mut skipped = 0;
        self.inner.iterate(&mut |d| {
            if skipped < self.n {
                skipped += 1;
                return Ok(Control::Continue);
            }
            visit(d)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value;
    use std::cell::Cell;

    struct Numbers {
        n: i64,
        pulled: Cell<i64>,
    }

    impl DocumentIterator for Numbers {
        fn iterate(&self, visit: &mut DocumentVisitor<'_>) -> DbResult<()> {
            for i in 0..self.n {
                self.pulled.set(self.pulled.get() + 1);
                let d = FieldBuffer::new().with("n", i);
                if visit(&d)? == Control::Stop {
                    break;
                }
            }
            Ok(())
        }
    }

    fn numbers(n: i64) -> Numbers {
        Numbers {
            n,
            pulled: Cell::new(0),
        }
    }

    fn values(s: &Stream<'_>) -> Vec<i64> {
        s.collect_buffers()
            .unwrap()
            .iter()
            .map(|d| d.get("n").and_then(Value::as_integer).unwrap())
            .collect()
    }

    #[test]
    fn test_stream_is_restartable() {
        let s = Stream::new(numbers(3));
        assert_eq!(values(&s), vec![0, 1, 2]);
        assert_eq!(values(&s), vec![0, 1, 2]);
    }

    #[test]
    fn test_limit_stops_upstream() {
        let src = numbers(100);
        {
            let s = Stream::new(&src).limit(2);
            assert_eq!(values(&s), vec![0, 1]);
        }
        assert_eq!(src.pulled.get(), 2);
    }

    #[test]
    fn test_offset_and_filter() {
        let s = Stream::new(numbers(10))
            .filter(|d| Ok(d.get_by_field("n")?.and_then(|v| v.as_integer()).unwrap_or(0) % 2 == 0))
            .offset(1)
            .limit(2);
        assert_eq!(values(&s), vec![2, 4]);
    }

    #[test]
    fn test_count_and_first() {
        let s = Stream::new(numbers(4));
        assert_eq!(s.count().unwrap(), 4);
        let first = s.first().unwrap().unwrap();
        assert_eq!(first.get("n"), Some(&Value::Integer(0)));
        assert!(Stream::empty().first().unwrap().is_none());
    }

    #[test]
    fn test_visitor_error_propagates() {
        let s = Stream::new(numbers(3));
        let err = s
            .iterate(&mut |_| Err(crate::errors::DbError::eval("boom")))
            .unwrap_err();
        assert_eq!(err.message(), "boom");
    }
}
