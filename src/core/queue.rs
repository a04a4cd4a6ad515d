//! Event queues.
//!
//! [`Queue`] is the interpreter's internal FIFO. [`BlockingQueue`] backs the
//! external channel: its single reader suspends until an item arrives, and
//! writers on any thread or task may wake it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Plain FIFO queue that never blocks.
#[derive(Clone, Debug)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared<T> {
    items: VecDeque<T>,
    waiter: Option<oneshot::Sender<T>>,
}

/// FIFO queue whose reader suspends while it is empty.
///
/// `enqueue` hands an item straight to a suspended reader when there is one,
/// otherwise it appends. Only one reader may be suspended at a time; a second
/// reader replaces the first, which then re-checks the queue.
///
/// # Example
///
/// ```rust
/// use statecraft::core::BlockingQueue;
/// use std::sync::Arc;
///
/// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// runtime.block_on(async {
///     let queue = Arc::new(BlockingQueue::new());
///     let writer = Arc::clone(&queue);
///
///     tokio::spawn(async move { writer.enqueue("ready") });
///
///     assert_eq!(queue.dequeue().await, "ready");
/// });
/// ```
pub struct BlockingQueue<T> {
    shared: Mutex<Shared<T>>,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            shared: Mutex::new(Shared {
                items: VecDeque::new(),
                waiter: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `item`, or deliver it directly to the suspended reader.
    pub fn enqueue(&self, item: T) {
        let mut shared = self.lock();
        let item = match shared.waiter.take() {
            Some(waiter) => match waiter.send(item) {
                Ok(()) => return,
                // reader went away before the hand-off
                Err(item) => item,
            },
            None => item,
        };
        shared.items.push_back(item);
    }

    /// Return the head of the queue, suspending until one is available.
    pub async fn dequeue(&self) -> T {
        loop {
            let receiver = {
                let mut shared = self.lock();
                if let Some(item) = shared.items.pop_front() {
                    return item;
                }
                let (sender, receiver) = oneshot::channel();
                shared.waiter = Some(sender);
                receiver
            };
            let mut pending = Pending {
                queue: self,
                receiver: Some(receiver),
            };
            if let Some(receiver) = pending.receiver.as_mut() {
                let outcome = receiver.await;
                pending.receiver = None;
                if let Ok(item) = outcome {
                    return item;
                }
            }
        }
    }

    /// Return the head of the queue without suspending.
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }
}

/// A suspended `dequeue`. Dropping it mid-wait puts back an item that was
/// already handed over.
struct Pending<'a, T> {
    queue: &'a BlockingQueue<T>,
    receiver: Option<oneshot::Receiver<T>>,
}

impl<T> Drop for Pending<'_, T> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
            if let Ok(item) = receiver.try_recv() {
                self.queue.lock().items.push_front(item);
            }
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn queue_is_fifo() {
        let mut queue = Queue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_returns_head_immediately() {
        let queue = BlockingQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");

        assert_eq!(queue.dequeue().await, "a");
        assert_eq!(queue.dequeue().await, "b");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_suspends_until_enqueue() {
        let queue = Arc::new(BlockingQueue::new());
        let writer = Arc::clone(&queue);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.enqueue(42);
        });

        let item = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
            .await
            .expect("reader was never woken");

        assert_eq!(item, 42);
        // handed off, not stored
        assert!(queue.is_empty());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_reader_does_not_lose_items() {
        let queue = BlockingQueue::new();

        let suspended = tokio::time::timeout(Duration::from_millis(5), queue.dequeue()).await;
        assert!(suspended.is_err());

        queue.enqueue(7);

        assert_eq!(queue.try_dequeue(), Some(7));
    }

    #[tokio::test]
    async fn cross_thread_enqueue_wakes_reader() {
        let queue = Arc::new(BlockingQueue::new());
        let writer = Arc::clone(&queue);

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            writer.enqueue("from-thread");
        });

        let item = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
            .await
            .expect("reader was never woken");
        assert_eq!(item, "from-thread");
    }
}
