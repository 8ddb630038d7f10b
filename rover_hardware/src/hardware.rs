//! Raspberry Pi drivers (`rppal`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::uart::{Parity, Uart};
use rover_traits::{DriverError, DutyDriver, EdgeSink, HostLink, ServoDriver};

use crate::error::{HwError, Result};
use crate::util::{SERVO_PERIOD, duty_fraction, servo_pulse_us};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn output_pin(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
}

/// H-bridge motor: software PWM on the enable pin, direction on a second pin.
pub struct PwmMotor {
    enable: OutputPin,
    dir: OutputPin,
    pwm_hz: f64,
    ceiling: u8,
}

impl PwmMotor {
    pub fn new(enable_pin: u8, dir_pin: u8, pwm_hz: u32, ceiling_pct: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let enable = output_pin(&gpio, enable_pin)?;
        let dir = output_pin(&gpio, dir_pin)?;
        tracing::info!(enable_pin, dir_pin, pwm_hz, ceiling_pct, "pwm motor ready");
        Ok(Self {
            enable,
            dir,
            pwm_hz: f64::from(pwm_hz),
            ceiling: ceiling_pct.clamp(1, 100),
        })
    }

    fn drive(&mut self, forward: bool, duty_pct: u8) -> Result<()> {
        if forward {
            self.dir.set_high();
        } else {
            self.dir.set_low();
        }
        self.enable
            .set_pwm_frequency(self.pwm_hz, duty_fraction(duty_pct, self.ceiling))
            .map_err(|e| HwError::Pwm(e.to_string()))
    }
}

impl DutyDriver for PwmMotor {
    fn set_forward(&mut self, duty_pct: u8) -> std::result::Result<(), DriverError> {
        Ok(self.drive(true, duty_pct)?)
    }

    fn set_backward(&mut self, duty_pct: u8) -> std::result::Result<(), DriverError> {
        Ok(self.drive(false, duty_pct)?)
    }

    fn stop(&mut self) -> std::result::Result<(), DriverError> {
        self.enable
            .clear_pwm()
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        self.enable.set_low();
        Ok(())
    }

    fn duty_ceiling(&self) -> u8 {
        self.ceiling
    }
}

/// Hobby servo on a software-PWM pin (50 Hz).
pub struct PwmServo {
    pin: OutputPin,
    min_pulse_us: u32,
    max_pulse_us: u32,
}

impl PwmServo {
    pub fn new(pin: u8, min_pulse_us: u32, max_pulse_us: u32) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let pin = output_pin(&gpio, pin)?;
        Ok(Self {
            pin,
            min_pulse_us,
            max_pulse_us,
        })
    }
}

impl ServoDriver for PwmServo {
    fn set_angle(&mut self, deg: u8) -> std::result::Result<(), DriverError> {
        let pulse = servo_pulse_us(deg, self.min_pulse_us, self.max_pulse_us);
        self.pin
            .set_pwm(SERVO_PERIOD, Duration::from_micros(u64::from(pulse)))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }
}

/// Host link on a UART, 8N1, with non-blocking reads.
pub struct UartLink {
    uart: Uart,
}

impl UartLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let mut uart = Uart::with_path(path, baud, Parity::None, 8, 1)
            .map_err(|e| HwError::Uart(format!("{path}: {e}")))?;
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        tracing::info!(path, baud, "uart link open");
        Ok(Self { uart })
    }
}

impl HostLink for UartLink {
    fn read_byte(&mut self) -> std::result::Result<Option<u8>, DriverError> {
        let mut buf = [0u8; 1];
        let n = self
            .uart
            .read(&mut buf)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        Ok((n == 1).then_some(buf[0]))
    }

    fn write_line(&mut self, line: &str) -> std::result::Result<(), DriverError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        let mut sent = 0;
        while sent < bytes.len() {
            let n = self
                .uart
                .write(&bytes[sent..])
                .map_err(|e| HwError::Uart(e.to_string()))?;
            if n == 0 {
                return Err(Box::new(HwError::LinkClosed));
            }
            sent += n;
        }
        Ok(())
    }
}

/// Interrupt-driven encoder thread.
///
/// Both channels trigger on both edges; the thread blocks in
/// `poll_interrupts` and hands the current levels to the sink. This thread is
/// the only caller of the sink. Shut down and joined on drop.
pub struct EncoderIrq {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Poll timeout, bounds how long shutdown can take.
const IRQ_POLL: Duration = Duration::from_millis(50);

/// Arm both encoder channels and spawn the edge thread.
///
/// `make_sink` receives the channel levels read at startup so the decoder can
/// be seeded with the real initial phase.
pub fn spawn_encoder_irq<E, F>(pin_a: u8, pin_b: u8, make_sink: F) -> Result<EncoderIrq>
where
    E: EdgeSink + Send + 'static,
    F: FnOnce(bool, bool) -> E,
{
    let gpio = Gpio::new().map_err(gpio_err)?;
    let mut a: InputPin = gpio.get(pin_a).map_err(gpio_err)?.into_input_pullup();
    let mut b: InputPin = gpio.get(pin_b).map_err(gpio_err)?.into_input_pullup();
    a.set_interrupt(Trigger::Both).map_err(gpio_err)?;
    b.set_interrupt(Trigger::Both).map_err(gpio_err)?;
    let mut sink = make_sink(a.is_high(), b.is_high());

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let join_handle = std::thread::spawn(move || {
        while !shutdown_clone.load(Ordering::Relaxed) {
            match gpio.poll_interrupts(&[&a, &b], false, Some(IRQ_POLL)) {
                Ok(Some(_)) => sink.on_edge(a.is_high(), b.is_high()),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "encoder interrupt poll failed");
                    break;
                }
            }
        }
        tracing::trace!("encoder irq thread exiting cleanly");
    });
    tracing::info!(pin_a, pin_b, "encoder interrupts armed");

    Ok(EncoderIrq {
        shutdown,
        join_handle: Some(join_handle),
    })
}

impl Drop for EncoderIrq {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "encoder irq thread panicked during shutdown");
        }
    }
}
