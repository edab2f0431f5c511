//! Sensor → logger → controller → actuator wiring over `bus-api`'s object
//! surface: a small industrial control loop used to exercise the bus
//! end to end.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bus_api::{get_instance, EventData, EventKind, EventMask, NodeFlags, NodeParams, NodeRef};

const TEMP_SENSOR: &str = "temp_sensor_1";
const DATA_LOGGER: &str = "data_logger";
const PID_CONTROLLER: &str = "pid_controller";
const HEATER_ACTUATOR: &str = "heater_actuator";

/// `{temperature: f64, timestamp: i64}`, little-endian, matching the
/// original's `TempSensorData_t` layout.
fn encode_reading(temperature: f64, timestamp: i64) -> [u8; 16] {
    let mut buf = [0u8; 16];
    buf[0..8].copy_from_slice(&temperature.to_le_bytes());
    buf[8..16].copy_from_slice(&timestamp.to_le_bytes());
    buf
}

fn decode_reading(buf: &[u8]) -> (f64, i64) {
    let temperature = f64::from_le_bytes(buf[0..8].try_into().unwrap());
    let timestamp = i64::from_le_bytes(buf[8..16].try_into().unwrap());
    (temperature, timestamp)
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64
}

fn main() {
    tracing_subscriber::fmt::try_init().ok();

    let bus = get_instance("industrial-demo");

    let sensor = bus
        .new_node(
            TEMP_SENSOR,
            NodeParams {
                payload_size: 16,
                flags: NodeFlags::CACHED,
                event_mask: EventMask::PULL,
                callback: Some(Arc::new(|p| {
                    if p.event == EventKind::Pull {
                        println!("[Sensor]   >> pull request from node {}", p.sender);
                    }
                    0
                })),
                ..Default::default()
            },
        )
        .expect("sensor registration");

    let logger = bus
        .new_node(
            DATA_LOGGER,
            NodeParams {
                event_mask: EventMask::PUBLISH,
                callback: Some(Arc::new(|p| {
                    if let EventData::Read(buf) = &p.data {
                        let (temp, ts) = decode_reading(buf);
                        println!("[Logger]   << {temp:.2} C at {ts} (from node {})", p.sender);
                    }
                    0
                })),
                ..Default::default()
            },
        )
        .expect("logger registration");
    assert_eq!(logger.subscribe(TEMP_SENSOR), 0, "logger subscribe to sensor");

    let controller = bus.new_node(PID_CONTROLLER, NodeParams::default()).expect("controller registration");

    let actuator = bus
        .new_node(
            HEATER_ACTUATOR,
            NodeParams {
                event_mask: EventMask::NOTIFY,
                callback: Some(Arc::new(|p| {
                    if let EventData::Read(buf) = &p.data {
                        let command = String::from_utf8_lossy(buf);
                        println!("[Actuator] << command '{command}' (from node {})", p.sender);
                    }
                    0
                })),
                ..Default::default()
            },
        )
        .expect("actuator registration");

    const SETPOINT: f64 = 21.0;
    let readings = [19.5, 20.8, 22.4, 23.1];

    for (i, &temperature) in readings.iter().enumerate() {
        let reading = encode_reading(temperature, now_ms());
        sensor.publish(&reading);

        let mut cached = [0u8; 16];
        let code = controller.pull(NodeRef::Name(TEMP_SENSOR), &mut cached);
        let (cached_temp, _) = decode_reading(&cached);
        println!("[Controller] round {i}: pulled {cached_temp:.2} C (code {code})");

        let command: &[u8] = if cached_temp > SETPOINT { b"heater_off" } else { b"heater_on" };
        actuator_command(&controller, command);
    }

    println!(
        "instance {:?} node_count={} sensor.sub_count={} logger.pub_count={}",
        bus.name(),
        bus.node_count(),
        sensor.sub_count(),
        logger.pub_count(),
    );

    for handle in [sensor.my_id(), logger.my_id(), controller.my_id(), actuator.my_id()] {
        bus.remove_node(NodeRef::Id(handle));
    }
}

fn actuator_command(controller: &bus_api::NodeHandle, command: &[u8]) {
    let code = controller.notify(NodeRef::Name(HEATER_ACTUATOR), command);
    if code != 0 {
        eprintln!("[Controller] notify({HEATER_ACTUATOR:?}) failed: {}", bus_api::proc_error_string(code));
    }
}
