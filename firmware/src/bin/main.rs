#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::Flex;
use embassy_stm32::mode::Async;
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, RingBufferedUartRx, Uart, UartTx};
use embassy_stm32::usb::{Driver, Endpoint, In, Out};
use embassy_stm32::{bind_interrupts, peripherals, usb, Config};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Ticker};
use embassy_usb::driver::{Endpoint as _, EndpointIn as _, EndpointOut as _};
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use heapless::spsc::{Producer, Queue};
use serial_core::engine::{DATA_ENDPOINTS, MAX_PACKET, NOTIFY_ENDPOINTS};
use serial_core::{
    Device, DmaDirection, DmaEvent, EndpointEvent, LoadSource, PinId, UsartEvent,
};
use static_cell::StaticCell;
use triple_serial::board::{self, PinBank, IN_READY, OUT_FREE, RX_QUEUE_LEN, TX_KICK};
use triple_serial::{
    add_cdc_port, with_shared, BoardFlash, BoardHal, CdcPort, Shared, SharedCell, UsbControl,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USB_LP_CAN1_RX0 => usb::InterruptHandler<peripherals::USB>;
    USART1 => usart::InterruptHandler<peripherals::USART1>;
    USART2 => usart::InterruptHandler<peripherals::USART2>;
    USART3 => usart::InterruptHandler<peripherals::USART3>;
});

type UsbDrv = Driver<'static, peripherals::USB>;
type BulkIn = Endpoint<'static, peripherals::USB, In>;
type BulkOut = Endpoint<'static, peripherals::USB, Out>;

/// USB descriptor and control buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 32]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static USB_CONTROL: StaticCell<UsbControl> = StaticCell::new();

/// Everything the core state machine touches, behind one lock.
static SHARED: StaticCell<SharedCell> = StaticCell::new();

/// Hardware receive rings for the ring-buffered UART reception.
static RX_DMA_BUF0: StaticCell<[u8; 256]> = StaticCell::new();
static RX_DMA_BUF1: StaticCell<[u8; 256]> = StaticCell::new();
static RX_DMA_BUF2: StaticCell<[u8; 256]> = StaticCell::new();

/// Byte queues between the RX pump tasks and the core's rx_sync.
static RX_QUEUE0: StaticCell<Queue<u8, RX_QUEUE_LEN>> = StaticCell::new();
static RX_QUEUE1: StaticCell<Queue<u8, RX_QUEUE_LEN>> = StaticCell::new();
static RX_QUEUE2: StaticCell<Queue<u8, RX_QUEUE_LEN>> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("triple-serial starting...");

    // 8 MHz HSE x9 = 72 MHz sysclk, USB clock at 48 MHz off the PLL.
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::{
            AHBPrescaler, APBPrescaler, Hse, HseMode, Pll, PllMul, PllPreDiv, PllSource, Sysclk,
        };
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll = Some(Pll {
            src: PllSource::HSE,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL9,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;
    }
    let p = embassy_stm32::init(config);

    // JTAG off (SWD stays): frees PA15/PB3/PB4 for GPIO use.
    embassy_stm32::pac::AFIO.mapr().modify(|w| w.set_swj_cfg(0b010));

    let mut flash = BoardFlash::new(Flash::new_blocking(p.FLASH));
    let (device, source) = Device::from_flash(&mut flash);
    match source {
        LoadSource::Page(page) => info!("configuration loaded from flash page {}", page),
        LoadSource::Defaults => info!("no valid configuration, using factory defaults"),
    }

    // --- UART setup ---
    // The three USARTs run on their default pins; the pin layer treats
    // those pins as peripheral-owned and the shell reassigns everything
    // else around them.
    let initial = || board::usart_config(&cdc_proto::LineCoding::DEFAULT);
    let uart0 =
        Uart::new(p.USART1, p.PA10, p.PA9, Irqs, p.DMA1_CH4, p.DMA1_CH5, initial()).unwrap();
    let uart1 =
        Uart::new(p.USART2, p.PA3, p.PA2, Irqs, p.DMA1_CH7, p.DMA1_CH6, initial()).unwrap();
    let uart2 =
        Uart::new(p.USART3, p.PB11, p.PB10, Irqs, p.DMA1_CH2, p.DMA1_CH3, initial()).unwrap();
    let (tx0, rx0) = uart0.split();
    let (tx1, rx1) = uart1.split();
    let (tx2, rx2) = uart2.split();
    let rx0 = rx0.into_ring_buffered(RX_DMA_BUF0.init([0; 256]));
    let rx1 = rx1.into_ring_buffered(RX_DMA_BUF1.init([0; 256]));
    let rx2 = rx2.into_ring_buffered(RX_DMA_BUF2.init([0; 256]));
    let (qp0, qc0) = RX_QUEUE0.init(Queue::new()).split();
    let (qp1, qc1) = RX_QUEUE1.init(Queue::new()).split();
    let (qp2, qc2) = RX_QUEUE2.init(Queue::new()).split();

    // --- GPIO bank ---
    // Slots stay empty where a peripheral owns the pin: PA9/PA10 (USART1),
    // PA2/PA3 (USART2), PB10/PB11 (USART3), PA11/PA12 (USB), PA13/PA14
    // (debugger), PB2 (BOOT1). Those are exactly the pins the pin layer
    // never drives.
    let mut pins: PinBank = [const { None }; PinId::COUNT];
    pins[PinId::Pa0.index()] = Some(Flex::new(p.PA0));
    pins[PinId::Pa1.index()] = Some(Flex::new(p.PA1));
    pins[PinId::Pa4.index()] = Some(Flex::new(p.PA4));
    pins[PinId::Pa5.index()] = Some(Flex::new(p.PA5));
    pins[PinId::Pa6.index()] = Some(Flex::new(p.PA6));
    pins[PinId::Pa7.index()] = Some(Flex::new(p.PA7));
    pins[PinId::Pa8.index()] = Some(Flex::new(p.PA8));
    pins[PinId::Pa15.index()] = Some(Flex::new(p.PA15));
    pins[PinId::Pb0.index()] = Some(Flex::new(p.PB0));
    pins[PinId::Pb1.index()] = Some(Flex::new(p.PB1));
    pins[PinId::Pb3.index()] = Some(Flex::new(p.PB3));
    pins[PinId::Pb4.index()] = Some(Flex::new(p.PB4));
    pins[PinId::Pb5.index()] = Some(Flex::new(p.PB5));
    pins[PinId::Pb6.index()] = Some(Flex::new(p.PB6));
    pins[PinId::Pb7.index()] = Some(Flex::new(p.PB7));
    pins[PinId::Pb8.index()] = Some(Flex::new(p.PB8));
    pins[PinId::Pb9.index()] = Some(Flex::new(p.PB9));
    pins[PinId::Pb12.index()] = Some(Flex::new(p.PB12));
    pins[PinId::Pb13.index()] = Some(Flex::new(p.PB13));
    pins[PinId::Pb14.index()] = Some(Flex::new(p.PB14));
    pins[PinId::Pb15.index()] = Some(Flex::new(p.PB15));
    pins[PinId::Pc13.index()] = Some(Flex::new(p.PC13));
    pins[PinId::Pc14.index()] = Some(Flex::new(p.PC14));
    pins[PinId::Pc15.index()] = Some(Flex::new(p.PC15));

    let hal = BoardHal::new(pins, [qc0, qc1, qc2]);
    let shared: &'static SharedCell =
        SHARED.init(Mutex::new(RefCell::new(Shared { device, hal, flash })));
    with_shared(shared, |s| {
        let Shared { device, hal, .. } = s;
        device.init_hardware(hal);
    });

    // --- USB setup ---
    let driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);

    let mut usb_config = UsbConfig::new(0x1209, 0x0003); // pid.codes test VID/PID
    usb_config.manufacturer = Some("triple-serial");
    usb_config.product = Some("Triple USB-serial adapter");
    usb_config.serial_number = Some(embassy_stm32::uid::uid_hex());
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    // Composite device grouped by IADs, one per communication/data pair.
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 32]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );
    builder.handler(USB_CONTROL.init(UsbControl::new(shared)));

    let port0 = add_cdc_port(&mut builder);
    let port1 = add_cdc_port(&mut builder);
    let port2 = add_cdc_port(&mut builder);

    let usb_device = builder.build();

    // Spawn tasks
    spawner.spawn(usb_task(usb_device)).unwrap();
    spawner.spawn(poll_task(shared)).unwrap();
    spawn_port(&spawner, shared, 0, port0, tx0, rx0, qp0);
    spawn_port(&spawner, shared, 1, port1, tx1, rx1, qp1);
    spawn_port(&spawner, shared, 2, port2, tx2, rx2, qp2);

    info!("triple-serial up, {} CDC ports", serial_core::PORT_COUNT);
}

/// Wire one port's endpoints and UART halves to their pump tasks.
fn spawn_port(
    spawner: &Spawner,
    shared: &'static SharedCell,
    port: usize,
    cdc: CdcPort<BulkIn, BulkOut>,
    tx: UartTx<'static, Async>,
    rx: RingBufferedUartRx<'static>,
    queue: Producer<'static, u8, RX_QUEUE_LEN>,
) {
    spawner
        .spawn(usb_in_task(shared, NOTIFY_ENDPOINTS[port], cdc.notify))
        .unwrap();
    spawner
        .spawn(usb_in_task(shared, DATA_ENDPOINTS[port], cdc.data_in))
        .unwrap();
    spawner
        .spawn(usb_out_task(shared, port, cdc.data_out))
        .unwrap();
    spawner.spawn(uart_rx_task(shared, port, rx, queue)).unwrap();
    spawner.spawn(uart_tx_task(shared, port, tx)).unwrap();
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDrv>) {
    device.run().await;
}

/// Move mailbox packets onto an IN endpoint (bulk data or notification)
/// and report completion back to the core.
#[embassy_executor::task(pool_size = 6)]
async fn usb_in_task(shared: &'static SharedCell, ep_id: u8, mut ep: BulkIn) {
    loop {
        IN_READY[usize::from(ep_id) - 1].wait().await;
        let Some(packet) = with_shared(shared, |s| s.hal.take_in(ep_id)) else {
            continue;
        };
        let result = ep.write(&packet).await;
        with_shared(shared, |s| {
            s.hal.in_done(ep_id);
            if result.is_ok() {
                let Shared {
                    device, hal, flash, ..
                } = s;
                device.handle_endpoint_event(hal, flash, ep_id, EndpointEvent::DataSent);
            }
        });
    }
}

/// Move received OUT packets into the core. The next packet stays here
/// (and the endpoint NAKs behind it) until the core drains the mailbox -
/// that is the bridge's USB-side backpressure.
#[embassy_executor::task(pool_size = 3)]
async fn usb_out_task(shared: &'static SharedCell, port: usize, mut ep: BulkOut) {
    let ep_id = DATA_ENDPOINTS[port];
    let mut buf = [0u8; MAX_PACKET];
    loop {
        match ep.read(&mut buf).await {
            Ok(n) => loop {
                let stashed = with_shared(shared, |s| {
                    if s.hal.out_free(ep_id) {
                        s.hal.stash_out(ep_id, &buf[..n]);
                        let Shared {
                            device, hal, flash, ..
                        } = s;
                        device.handle_endpoint_event(hal, flash, ep_id, EndpointEvent::DataReceived);
                        true
                    } else {
                        false
                    }
                });
                if stashed {
                    break;
                }
                OUT_FREE[port].wait().await;
            },
            Err(_) => ep.wait_enabled().await,
        }
    }
}

/// Feed received serial bytes into the port's queue and trigger a resync,
/// standing in for the idle-line/DMA interrupts of the bare-metal design.
#[embassy_executor::task(pool_size = 3)]
async fn uart_rx_task(
    shared: &'static SharedCell,
    port: usize,
    mut rx: RingBufferedUartRx<'static>,
    mut queue: Producer<'static, u8, RX_QUEUE_LEN>,
) {
    let mut buf = [0u8; MAX_PACKET];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                if !board::receiver_open(port) {
                    continue;
                }
                for &byte in &buf[..n] {
                    if queue.enqueue(byte).is_err() {
                        board::note_rx_dropped(port, 1);
                    }
                }
                with_shared(shared, |s| {
                    let Shared { device, hal, .. } = s;
                    device.handle_usart_event(hal, port, UsartEvent::Idle);
                });
            }
            Err(e) => {
                let event = match e {
                    usart::Error::Parity => UsartEvent::ParityError,
                    usart::Error::Overrun => UsartEvent::Overrun,
                    _ => UsartEvent::Idle,
                };
                with_shared(shared, |s| {
                    let Shared { device, hal, .. } = s;
                    device.handle_usart_event(hal, port, event);
                });
            }
        }
    }
}

/// Put staged bytes on the wire and report the transfer complete. Also
/// applies deferred line-coding changes; the halves share the USART's
/// control registers, so programming through the TX half is enough.
#[embassy_executor::task(pool_size = 3)]
async fn uart_tx_task(shared: &'static SharedCell, port: usize, mut tx: UartTx<'static, Async>) {
    loop {
        TX_KICK[port].wait().await;
        if let Some(config) = with_shared(shared, |s| s.hal.take_pending_config(port)) {
            if tx.set_config(&config).is_err() {
                warn!("usart{}: line coding rejected by hardware", port);
            }
        }
        let Some(data) = with_shared(shared, |s| s.hal.take_tx(port)) else {
            continue;
        };
        if tx.write(&data).await.is_err() {
            warn!("usart{}: transmit failed", port);
        }
        with_shared(shared, |s| {
            s.hal.tx_done(port);
            let Shared { device, hal, .. } = s;
            device.handle_dma_event(hal, port, DmaDirection::Tx, DmaEvent::TransferComplete);
        });
    }
}

/// 1 ms foreground tick: flush retries, the 20 ms modem-line scan and the
/// config-pin sampling all live in the core's poll.
#[embassy_executor::task]
async fn poll_task(shared: &'static SharedCell) {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        ticker.next().await;
        with_shared(shared, |s| {
            let Shared { device, hal, .. } = s;
            device.poll(hal);
        });
    }
}
