//! In-process message bus
//!
//! Each topic is an append-only log shared by every handle obtained from the
//! same [`InMemoryMessageBus`]. Consumers keep their own offset and read from
//! the earliest retained record; producers append. When a topic has a
//! capacity, the oldest records are evicted and lagging consumers skip ahead.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use frontier_interfaces::{BusError, LogConsumer, LogProducer, MessageBus, StreamLog};

/// Default topic carrying reset control signals
pub const DEFAULT_RESET_TOPIC: &str = "frontier-reset";

/// Default topic carrying reset acknowledgments
pub const DEFAULT_RESET_ACK_TOPIC: &str = "frontier-reset-ack";

/// A record stored in a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Option<Bytes>,
    pub payload: Bytes,
}

#[derive(Debug, Default)]
struct TopicState {
    records: VecDeque<Record>,
    /// Offset of `records[0]`
    base_offset: u64,
    closed: bool,
}

impl TopicState {
    fn end_offset(&self) -> u64 {
        self.base_offset + self.records.len() as u64
    }
}

#[derive(Debug)]
struct Topic {
    name: String,
    capacity: Option<usize>,
    state: Mutex<TopicState>,
    appended: Condvar,
}

impl Topic {
    fn new(name: String, capacity: Option<usize>) -> Self {
        Self {
            name,
            capacity,
            state: Mutex::new(TopicState::default()),
            appended: Condvar::new(),
        }
    }

    fn append(&self, record: Record) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(BusError::ConnectionClosed);
        }

        state.records.push_back(record);
        if let Some(capacity) = self.capacity {
            while state.records.len() > capacity {
                state.records.pop_front();
                state.base_offset += 1;
            }
        }

        self.appended.notify_all();
        Ok(())
    }

    fn read(
        &self,
        offset: &mut u64,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Bytes>, BusError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(BusError::ConnectionClosed);
            }

            if *offset < state.base_offset {
                warn!(
                    "Consumer on {} lagged behind retention, skipping {} records",
                    self.name,
                    state.base_offset - *offset
                );
                *offset = state.base_offset;
            }

            if *offset < state.end_offset() {
                let start = (*offset - state.base_offset) as usize;
                let messages: Vec<Bytes> = state
                    .records
                    .iter()
                    .skip(start)
                    .take(count)
                    .map(|record| record.payload.clone())
                    .collect();
                *offset += messages.len() as u64;
                return Ok(messages);
            }

            if self.appended.wait_until(&mut state, deadline).timed_out() {
                return Ok(Vec::new());
            }
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.appended.notify_all();
    }
}

/// In-process message bus holding named topics
#[derive(Debug, Clone)]
pub struct InMemoryMessageBus {
    topics: Arc<Mutex<HashMap<String, Arc<Topic>>>>,
    reset_topic: String,
    reset_ack_topic: String,
    capacity: Option<usize>,
}

impl InMemoryMessageBus {
    /// Create a bus with the default topic names and unbounded retention
    pub fn new() -> Self {
        Self::with_topics(DEFAULT_RESET_TOPIC, DEFAULT_RESET_ACK_TOPIC)
    }

    /// Create a bus with custom reset and reset-ack topic names
    pub fn with_topics(reset_topic: impl Into<String>, reset_ack_topic: impl Into<String>) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            reset_topic: reset_topic.into(),
            reset_ack_topic: reset_ack_topic.into(),
            capacity: None,
        }
    }

    /// Bound every topic created from now on to `capacity` records
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn reset_topic(&self) -> &str {
        &self.reset_topic
    }

    pub fn reset_ack_topic(&self) -> &str {
        &self.reset_ack_topic
    }

    /// Open a log by name, creating the topic on first use
    pub fn log(&self, name: &str) -> InMemoryLog {
        InMemoryLog {
            topic: self.topic(name),
        }
    }

    /// Snapshot of the records currently retained in a topic
    pub fn records(&self, name: &str) -> Vec<Record> {
        match self.topics.lock().get(name) {
            Some(topic) => topic.state.lock().records.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Close every topic; blocked consumers are released with an error
    pub fn close(&self) {
        for topic in self.topics.lock().values() {
            topic.close();
        }
        debug!("In-memory message bus closed");
    }

    fn topic(&self, name: &str) -> Arc<Topic> {
        let mut topics = self.topics.lock();
        topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Topic::new(name.to_string(), self.capacity)))
            .clone()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for InMemoryMessageBus {
    fn reset_log(&self) -> Result<Box<dyn StreamLog>, BusError> {
        Ok(Box::new(self.log(&self.reset_topic)))
    }

    fn reset_ack_log(&self) -> Result<Box<dyn StreamLog>, BusError> {
        Ok(Box::new(self.log(&self.reset_ack_topic)))
    }
}

/// Handle to a single topic
#[derive(Debug, Clone)]
pub struct InMemoryLog {
    topic: Arc<Topic>,
}

impl InMemoryLog {
    pub fn name(&self) -> &str {
        &self.topic.name
    }

    /// Typed consumer starting at the earliest retained record
    pub fn in_memory_consumer(&self) -> InMemoryConsumer {
        let offset = self.topic.state.lock().base_offset;
        InMemoryConsumer {
            topic: self.topic.clone(),
            offset,
        }
    }

    pub fn in_memory_producer(&self) -> InMemoryProducer {
        InMemoryProducer {
            topic: self.topic.clone(),
        }
    }
}

impl StreamLog for InMemoryLog {
    fn consumer(&self) -> Result<Box<dyn LogConsumer>, BusError> {
        Ok(Box::new(self.in_memory_consumer()))
    }

    fn producer(&self) -> Result<Box<dyn LogProducer>, BusError> {
        Ok(Box::new(self.in_memory_producer()))
    }
}

/// Consumer with a private read offset
#[derive(Debug)]
pub struct InMemoryConsumer {
    topic: Arc<Topic>,
    offset: u64,
}

impl InMemoryConsumer {
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl LogConsumer for InMemoryConsumer {
    fn get_messages(&mut self, count: usize, timeout: Duration) -> Result<Vec<Bytes>, BusError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.topic.read(&mut self.offset, count, timeout)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryProducer {
    topic: Arc<Topic>,
}

impl LogProducer for InMemoryProducer {
    fn send(&self, key: Option<&[u8]>, payload: Bytes) -> Result<(), BusError> {
        self.topic.append(Record {
            key: key.map(Bytes::copy_from_slice),
            payload,
        })
    }
}
