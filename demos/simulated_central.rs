//! Runs the relative mouse profile against an in-process central and prints
//! what the central sees.

use std::time::Duration;

use ble_hid_peripheral::config::Profile;
use ble_hid_peripheral::gatt::ObjectPath;
use ble_hid_peripheral::hid::{
    report_map::RELATIVE_MOUSE, MouseReport, ReportDescriptor, ReportKind,
};
use ble_hid_peripheral::peripheral::loopback::loopback;
use ble_hid_peripheral::{Application, Config, Error};

const BATTERY_LEVEL: &str = "/org/bluez/example/service0/char0";
const MOUSE_REPORT: &str = "/org/bluez/example/service2/char3";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    if let Err(err) = pretty_env_logger::try_init() {
        eprintln!("WARNING: failed to initialize logging framework: {}", err);
    }

    let config = Config {
        profile: Profile::RelativeMouse,
        pulses: ble_hid_peripheral::config::PulseConfig {
            relative_mouse_ms: 200,
            ..Default::default()
        },
        ..Config::default()
    };
    let mut app = Application::from_config(&config)?;
    let (mut peripheral, pending) = loopback("simulated-central");

    let central = async {
        let mut central = pending.connect().await?;
        let objects = central.managed_objects().await?;
        for path in objects.paths() {
            println!("{}", path);
        }

        let descriptor = ReportDescriptor::parse(RELATIVE_MOUSE)?;
        let battery = ObjectPath::new(BATTERY_LEVEL)?;
        let report = ObjectPath::new(MOUSE_REPORT)?;
        println!("battery: {:?}", central.read(&battery).await);

        central.subscribe(&report).await?;
        for _ in 0..3 {
            let Some(notification) = central.next_notification().await else {
                break;
            };
            let layout = descriptor.report(1, ReportKind::Input);
            println!(
                "{}: {:?} {:?}",
                notification.path,
                MouseReport::from_bytes(&notification.value),
                layout.map(|layout| layout.values(&notification.value))
            );
        }
        central.unsubscribe(&report).await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
        central.disconnect().await
    };

    let (served, driven) = tokio::join!(
        app.serve(&mut peripheral, std::future::pending::<()>()),
        central
    );
    served?;
    driven
}
