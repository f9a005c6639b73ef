use ostinato_core::{
    forwarding_report_handler, notification_channel, report_handler_for, FixedText, Notification,
};
use ostinato_ports::engine::PolyStats;
use ostinato_ports::storage::SessionSettings;
use pretty_assertions::assert_eq;

#[test]
fn fixed_text_truncates_on_char_boundary() {
    let text = FixedText::<4>::new("abé!");
    assert_eq!(text.as_str(), "abé");
    let text = FixedText::<3>::new("abé");
    assert_eq!(text.as_str(), "ab");
}

#[test]
fn full_queue_counts_drops() {
    let (sender, mut receiver) = notification_channel(1);
    assert!(sender.send(Notification::DeviceReset));
    assert!(!sender.send(Notification::ReverbMode(1)));
    assert_eq!(receiver.dropped(), 1);
    assert_eq!(receiver.drain(), vec![Notification::DeviceReset]);
    assert_eq!(receiver.pop(), None);
}

#[test]
fn forwarding_handler_pushes_reports() {
    let (sender, mut receiver) = notification_channel(8);
    let mut handler = forwarding_report_handler(sender);
    handler.lcd_message("Hello from the engine!");
    handler.program_changed(2, 1, "Fantasy");
    handler.poly_state_changed(
        3,
        PolyStats {
            polys: 2,
            non_releasing: 1,
        },
    );
    handler.debug("not forwarded");

    let notifications = receiver.drain();
    assert_eq!(notifications.len(), 3);
    match notifications[0] {
        Notification::LcdMessage(text) => assert_eq!(text.as_str(), "Hello from the engin"),
        other => panic!("unexpected notification {other:?}"),
    }
    match notifications[1] {
        Notification::ProgramChanged { part, bank, patch_name } => {
            assert_eq!((part, bank, patch_name.as_str()), (2, 1, "Fantasy"));
        }
        other => panic!("unexpected notification {other:?}"),
    }
    assert_eq!(
        notifications[2],
        Notification::PolyStateChanged {
            part: 3,
            stats: PolyStats {
                polys: 2,
                non_releasing: 1
            }
        }
    );
}

#[test]
fn settings_decide_whether_reports_are_forwarded() {
    let (_, receiver) = report_handler_for(&SessionSettings::default());
    assert!(receiver.is_some());

    let settings = SessionSettings {
        forward_reports: false,
        ..SessionSettings::default()
    };
    let (mut handler, receiver) = report_handler_for(&settings);
    assert!(receiver.is_none());
    assert!(handler.on_lcd_message.is_none());
    handler.lcd_message("logged only");
}
