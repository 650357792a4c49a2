#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use combowatch::controller::{DeviceInfo, InputBackend, RawControllerEvent, SessionError};

/// What the scripted backend does once its batches run out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AfterScript {
    Idle,
    Disconnect,
}

pub struct ScriptedBackend {
    devices: usize,
    batches: VecDeque<Vec<RawControllerEvent>>,
    after: AfterScript,
    counters: Counters,
}

#[derive(Clone, Default)]
pub struct Counters {
    pub polls: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl Counters {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScriptedBackend {
    pub fn new(
        devices: usize,
        batches: Vec<Vec<RawControllerEvent>>,
        after: AfterScript,
        counters: Counters,
    ) -> Self {
        Self {
            devices,
            batches: batches.into(),
            after,
            counters,
        }
    }
}

impl InputBackend for ScriptedBackend {
    fn connected_devices(&mut self) -> Vec<DeviceInfo> {
        (0..self.devices)
            .map(|id| DeviceInfo {
                id,
                name: format!("Scripted pad {id}"),
            })
            .collect()
    }

    fn bind(&mut self, _device: &DeviceInfo) -> Result<(), SessionError> {
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<RawControllerEvent> {
        self.counters.polls.fetch_add(1, Ordering::SeqCst);
        match self.batches.pop_front() {
            Some(batch) => batch,
            None if self.after == AfterScript::Disconnect => vec![RawControllerEvent::Disconnected],
            None => Vec::new(),
        }
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn down(buttons: &[u16]) -> Vec<RawControllerEvent> {
    buttons
        .iter()
        .map(|&button| RawControllerEvent::ButtonDown { button })
        .collect()
}

pub fn up(buttons: &[u16]) -> Vec<RawControllerEvent> {
    buttons
        .iter()
        .map(|&button| RawControllerEvent::ButtonUp { button })
        .collect()
}
