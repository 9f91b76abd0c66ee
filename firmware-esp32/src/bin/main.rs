#![no_std]
#![no_main]

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_println as _;
use exonaut_firmware_esp32::{
    ControlError, Exonaut, IrChannel, IrEvent, IrEventKind, LinkReader, MotorSelect, Telemetry,
    UartLinkRx, UartLinkTx,
};
use exonaut_proto::UART_BAUDRATE;
use static_cell::StaticCell;

type Mutex = CriticalSectionRawMutex;

/// Shared co-processor state, written by the reader task.
static TELEMETRY: StaticCell<Telemetry<Mutex>> = StaticCell::new();

/// IR remote events from the reader task to the control loop.
static IR_EVENTS: StaticCell<IrChannel<Mutex>> = StaticCell::new();

/// How often the control loop reports encoders and battery.
const REPORT_PERIOD: Duration = Duration::from_secs(1);

/// Drive speed (percent) used by IR remote control.
const DRIVE_SPEED: f32 = 50.0;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    info!("ExoNaut starting...");

    let p = esp_hal::init(esp_hal::Config::default());

    let timg0 = TimerGroup::new(p.TIMG0);
    esp_hal_embassy::init(timg0.timer0);

    let telemetry: &'static Telemetry<Mutex> = TELEMETRY.init(Telemetry::new());
    let ir_events: &'static IrChannel<Mutex> = IR_EVENTS.init(IrChannel::new());

    // --- UART Setup ---
    let uart_config = UartConfig::default().with_baudrate(UART_BAUDRATE);
    let uart = Uart::new(p.UART2, uart_config)
        .unwrap()
        .with_rx(p.GPIO16)
        .with_tx(p.GPIO17)
        .into_async();
    let (rx, tx) = uart.split();

    let reader = LinkReader::new(UartLinkRx::new(rx), telemetry, ir_events.sender());
    spawner.spawn(reader_task(reader)).unwrap();

    let mut robot = Exonaut::new(UartLinkTx::new(tx), Delay, telemetry);
    if let Err(e) = robot.begin().await {
        error!("co-processor start-up failed: {:?}", e);
    }
    if let Some(version) = robot.firmware_version() {
        info!("co-processor firmware {=[u8]:a}", version.as_bytes());
    }

    info!("ExoNaut initialized, waiting for IR remote...");

    loop {
        match select(ir_events.receive(), Timer::after(REPORT_PERIOD)).await {
            Either::First(event) => {
                if let Err(e) = handle_ir(&mut robot, event).await {
                    error!("IR command failed: {:?}", e);
                }
            }
            Either::Second(()) => report(&mut robot).await,
        }
    }
}

/// Reader task - owns the receive half and never returns.
#[embassy_executor::task]
async fn reader_task(mut reader: LinkReader<'static, UartLinkRx<'static>, Mutex>) {
    reader.run().await
}

/// Press drives forward while held; a long press pivots left.
async fn handle_ir(
    robot: &mut Exonaut<'static, UartLinkTx<'static>, Delay, Mutex>,
    event: IrEvent,
) -> Result<(), ControlError> {
    info!("IR {=u16:#x} {:?} ({=u8})", event.code, event.kind, event.kind.id());
    match event.kind {
        IrEventKind::Press => robot.set_speed(DRIVE_SPEED, DRIVE_SPEED).await,
        IrEventKind::LongPress => robot.turn(DRIVE_SPEED, 90.0).await,
        IrEventKind::Release | IrEventKind::LongRelease => {
            robot.stop_motor(MotorSelect::Both).await
        }
    }
}

async fn report(robot: &mut Exonaut<'static, UartLinkTx<'static>, Delay, Mutex>) {
    match robot.read_encoder_count().await {
        Ok([m1, m2]) => info!("encoders {} {} rev", m1, m2),
        Err(ControlError::Timeout) => warn!("encoder report missing"),
        Err(e) => error!("encoder query failed: {:?}", e),
    }
    if let Some(mv) = robot.battery_millivolts() {
        info!("battery {} mV", mv);
    }
}
