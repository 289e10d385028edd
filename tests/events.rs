use {
    async_io::block_on,
    cec_bridge::{
        driver::simulated::{SimulatedBus, SimulatedDriver},
        event::{AlertKind, AlertParameter, Direction, Event, LogLevel},
        sys, Client, Configuration, Connection, DeviceType, EventStream, LogicalAddress,
    },
    futures_util::StreamExt,
    std::{thread, time::Duration},
};

fn open(bus: &SimulatedBus) -> (Connection<SimulatedDriver>, EventStream) {
    bus.add_adapter("/sys/devices/usb1/1-2", "/dev/ttyACM0");
    let (client, events) = Client::<SimulatedDriver>::initialise(
        bus.clone(),
        Configuration::new("cec-bridge", DeviceType::Recording),
    )
    .unwrap();
    (client.open("ttyACM").unwrap(), events)
}

fn opcode(event: Event) -> Option<u8> {
    match event {
        Event::Command(command) => command.opcode,
        other => panic!("expected a command, got {other:?}"),
    }
}

#[test]
fn events_arrive_in_firing_order() {
    let bus = SimulatedBus::new();
    let (_cec, events) = open(&bus);

    let driver = thread::spawn({
        let bus = bus.clone();
        move || {
            assert!(bus.fire_frame(&[0x0F, 0x87, 0x00, 0xE0, 0x91]));
            assert!(bus.fire_frame(&[0x0F, 0x84, 0x00, 0x00, 0x00]));
            assert!(bus.fire_frame(&[0x0F, 0x36]));
        }
    });

    let received: Vec<Option<u8>> = (0..3)
        .map(|_| opcode(events.recv_blocking().unwrap()))
        .collect();
    driver.join().unwrap();
    assert_eq!(received, [Some(0x87), Some(0x84), Some(0x36)]);
}

#[test]
fn publisher_waits_for_the_consumer() {
    let bus = SimulatedBus::new();
    let (_cec, events) = open(&bus);

    let driver = thread::spawn({
        let bus = bus.clone();
        move || {
            bus.fire_key_press(0x44, 0);
            bus.fire_key_press(0x45, 0);
        }
    });

    thread::sleep(Duration::from_millis(50));
    // The first event fills the stream, the second is still being published
    assert!(!driver.is_finished());

    assert!(matches!(events.recv_blocking(), Some(Event::KeyPress(key)) if key.name == "play"));
    assert!(matches!(events.recv_blocking(), Some(Event::KeyPress(key)) if key.name == "stop"));
    driver.join().unwrap();
}

#[test]
fn teardown_releases_blocked_callback() {
    let bus = SimulatedBus::new();
    let (cec, events) = open(&bus);

    let driver = thread::spawn({
        let bus = bus.clone();
        move || {
            bus.fire_menu_state(sys::CEC_MENU_STATE_ACTIVATED);
            // Blocks until teardown closes the stream
            bus.fire_menu_state(sys::CEC_MENU_STATE_DEACTIVATED)
        }
    });
    thread::sleep(Duration::from_millis(50));

    cec.destroy();
    assert_eq!(
        driver.join().unwrap(),
        Some(sys::MENU_STATE_HANDLED)
    );
    assert_eq!(bus.destroyed(), 1);

    // Only the event accepted before teardown is left
    assert!(matches!(events.try_recv(), Some(Event::MenuState(state)) if state.activated));
    assert!(events.try_recv().is_none());
    assert!(events.is_closed());
}

#[test]
fn every_callback_kind_becomes_an_event() {
    let bus = SimulatedBus::new();
    let (_cec, events) = open(&bus);

    let driver = thread::spawn({
        let bus = bus.clone();
        move || {
            bus.fire_log_message(sys::CEC_LOG_TRAFFIC, ">> 40:04", 1200);
            bus.fire_key_press(0x00, 150);
            bus.fire_frame(&[0x40, 0x04]);
            bus.fire_alert(sys::CEC_ALERT_PERMISSION_ERROR, Some("/dev/ttyACM0"));
            bus.fire_menu_state(sys::CEC_MENU_STATE_DEACTIVATED);
            bus.fire_configuration_changed();
            bus.fire_source_activated(4, true);
        }
    });

    let Some(Event::LogMessage(message)) = events.recv_blocking() else {
        panic!("expected a log message");
    };
    assert_eq!(message.level, LogLevel::Traffic);
    assert_eq!(message.direction, Direction::Inbound);
    assert_eq!(message.since_connection, Duration::from_millis(1200));

    let Some(Event::KeyPress(key)) = events.recv_blocking() else {
        panic!("expected a key press");
    };
    assert_eq!(key.name, "select");
    assert_eq!(key.duration, Duration::from_millis(150));

    let Some(Event::Command(command)) = events.recv_blocking() else {
        panic!("expected a command");
    };
    assert_eq!(command.initiator, LogicalAddress::PLAYBACK_DEVICE_1);
    assert_eq!(command.destination, LogicalAddress::TV);
    assert_eq!(command.opcode_name(), Some("image view on"));
    assert!(command.parameters.is_empty());

    let Some(Event::Alert(alert)) = events.recv_blocking() else {
        panic!("expected an alert");
    };
    assert_eq!(alert.kind, AlertKind::PermissionError);
    assert_eq!(
        alert.parameter,
        AlertParameter::String("/dev/ttyACM0".to_owned())
    );

    let Some(Event::MenuState(state)) = events.recv_blocking() else {
        panic!("expected a menu state");
    };
    assert!(!state.activated);

    // Configuration changes publish nothing
    let Some(Event::SourceActivated(source)) = events.recv_blocking() else {
        panic!("expected a source activation");
    };
    assert_eq!(source.address, LogicalAddress::PLAYBACK_DEVICE_1);
    assert!(source.activated);

    driver.join().unwrap();
}

#[test]
fn oversized_parameter_block_is_clamped() {
    let bus = SimulatedBus::new();
    let (_cec, events) = open(&bus);

    let mut command = sys::CecCommand {
        initiator: 0,
        destination: 15,
        opcode: 0x64,
        opcode_set: 1,
        ..Default::default()
    };
    command.parameters.data = [0xAB; sys::CEC_MAX_DATA_PACKET_SIZE];
    command.parameters.size = 200;
    bus.fire_command(&command);

    let Some(Event::Command(command)) = events.try_recv() else {
        panic!("expected a command");
    };
    assert_eq!(command.parameters.len(), 14);
    assert!(command.is_broadcast());
}

#[test]
fn out_of_range_source_is_unregistered() {
    let bus = SimulatedBus::new();
    let (_cec, events) = open(&bus);

    bus.fire_source_activated(sys::CECDEVICE_UNKNOWN, false);
    let Some(Event::SourceActivated(source)) = events.try_recv() else {
        panic!("expected a source activation");
    };
    assert_eq!(source.address, LogicalAddress::UNREGISTERED);
    assert_eq!(source.address.address(), 15);
    assert_ne!(source.address.name(), LogicalAddress::BROADCAST.name());
}

#[test]
fn stream_can_be_consumed_asynchronously() {
    let bus = SimulatedBus::new();
    let (cec, events) = open(&bus);

    let driver = thread::spawn({
        let bus = bus.clone();
        move || {
            for code in [0x41, 0x42, 0x43] {
                bus.fire_key_press(code, 0);
            }
        }
    });

    let names: Vec<&str> = block_on(
        events
            .into_stream()
            .take(3)
            .map(|event| match event {
                Event::KeyPress(key) => key.name,
                other => panic!("expected a key press, got {other:?}"),
            })
            .collect(),
    );
    driver.join().unwrap();
    cec.destroy();
    assert_eq!(names, ["volume up", "volume down", "mute"]);
}
