//! Engine reports forwarded from the audio thread to a control thread
//! as fixed-size `Copy` values over an rtrb ring buffer.

use ostinato_ports::engine::{PolyStats, ReportHandler};
use ostinato_ports::storage::SessionSettings;
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const LCD_MESSAGE_LEN: usize = 20;
pub const PATCH_NAME_LEN: usize = 10;

/// UTF-8 text truncated to at most `N` bytes on a char boundary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedText<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> FixedText<N> {
    pub fn new(text: &str) -> Self {
        let len = (0..=text.len().min(N))
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        let mut bytes = [0u8; N];
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self { bytes, len }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

impl<const N: usize> std::fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    LcdMessage(FixedText<LCD_MESSAGE_LEN>),
    ProgramChanged {
        part: u8,
        bank: u8,
        patch_name: FixedText<PATCH_NAME_LEN>,
    },
    PolyStateChanged {
        part: u8,
        stats: PolyStats,
    },
    ReverbMode(u8),
    ReverbTime(u8),
    ReverbLevel(u8),
    DeviceReset,
}

#[derive(Clone)]
pub struct NotifySender {
    producer: Arc<Mutex<Producer<Notification>>>,
    dropped: Arc<AtomicU64>,
}

pub struct NotifyReceiver {
    consumer: Consumer<Notification>,
    dropped: Arc<AtomicU64>,
}

pub fn notification_channel(capacity: usize) -> (NotifySender, NotifyReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        NotifySender {
            producer: Arc::new(Mutex::new(producer)),
            dropped: dropped.clone(),
        },
        NotifyReceiver { consumer, dropped },
    )
}

impl NotifySender {
    /// Never blocks: a full queue or a contended producer drops the notification.
    pub fn send(&self, notification: Notification) -> bool {
        let pushed = match self.producer.try_lock() {
            Some(mut producer) => producer.push(notification).is_ok(),
            None => false,
        };
        if !pushed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        pushed
    }
}

impl NotifyReceiver {
    pub fn pop(&mut self) -> Option<Notification> {
        self.consumer.pop().ok()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::with_capacity(self.consumer.slots());
        while let Ok(notification) = self.consumer.pop() {
            out.push(notification);
        }
        out
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Debug text and open errors are not forwarded; they go to the log.
pub fn forwarding_report_handler(sender: NotifySender) -> ReportHandler {
    let lcd = sender.clone();
    let program = sender.clone();
    let poly = sender.clone();
    let reverb_mode = sender.clone();
    let reverb_time = sender.clone();
    let reverb_level = sender.clone();
    let reset = sender;

    ReportHandler {
        on_lcd_message: Some(Box::new(move |message| {
            lcd.send(Notification::LcdMessage(FixedText::new(message)));
        })),
        on_program_changed: Some(Box::new(move |part, bank, patch_name| {
            program.send(Notification::ProgramChanged {
                part,
                bank,
                patch_name: FixedText::new(patch_name),
            });
        })),
        on_poly_state_changed: Some(Box::new(move |part, stats| {
            poly.send(Notification::PolyStateChanged { part, stats });
        })),
        on_reverb_mode: Some(Box::new(move |mode| {
            reverb_mode.send(Notification::ReverbMode(mode));
        })),
        on_reverb_time: Some(Box::new(move |time| {
            reverb_time.send(Notification::ReverbTime(time));
        })),
        on_reverb_level: Some(Box::new(move |level| {
            reverb_level.send(Notification::ReverbLevel(level));
        })),
        on_device_reset: Some(Box::new(move || {
            reset.send(Notification::DeviceReset);
        })),
        ..ReportHandler::default()
    }
}

pub fn report_handler_for(settings: &SessionSettings) -> (ReportHandler, Option<NotifyReceiver>) {
    if !settings.forward_reports {
        return (ReportHandler::default(), None);
    }
    let (sender, receiver) = notification_channel(settings.notification_capacity);
    (forwarding_report_handler(sender), Some(receiver))
}
