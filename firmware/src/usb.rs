//! CDC-ACM interface assembly and control-request handling.
//!
//! Each port is one communication interface (with its functional
//! descriptors and interrupt endpoint) plus one bulk data interface,
//! grouped by an interface association descriptor. The builder hands the
//! endpoints back raw; the pump tasks in the binary move packets between
//! them and the core's mailboxes.

use cdc_proto::descriptor::{
    ACM_CAPABILITY_LINE_CODING, CDC_BCD_VERSION, CDC_PROTOCOL_NONE, CDC_SUBCLASS_ACM,
    CDC_TYPE_ACM, CDC_TYPE_CALL_MANAGEMENT, CDC_TYPE_HEADER, CDC_TYPE_UNION, CS_INTERFACE,
    USB_CLASS_CDC, USB_CLASS_CDC_DATA,
};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Handler};
use serial_core::engine::{interface_port, MAX_PACKET};

use crate::board::NOTIFY_PACKET;
use crate::{with_shared, Shared, SharedCell};

/// The raw endpoints of one CDC-ACM function pair.
pub struct CdcPort<I, O> {
    pub notify: I,
    pub data_in: I,
    pub data_out: O,
}

/// Add one communication + data interface pair to the device.
///
/// Interface numbers are allocated in call order, so calling this three
/// times yields communication interfaces 0, 2 and 4 — the numbering the
/// core's `interface_port` expects.
pub fn add_cdc_port<'d, D: Driver<'d>>(
    builder: &mut Builder<'d, D>,
) -> CdcPort<D::EndpointIn, D::EndpointOut> {
    let mut func = builder.function(USB_CLASS_CDC, CDC_SUBCLASS_ACM, CDC_PROTOCOL_NONE);

    let mut iface = func.interface();
    let comm_if = iface.interface_number();
    let data_if = u8::from(comm_if) + 1;
    let mut alt = iface.alt_setting(USB_CLASS_CDC, CDC_SUBCLASS_ACM, CDC_PROTOCOL_NONE, None);
    alt.descriptor(
        CS_INTERFACE,
        &[
            CDC_TYPE_HEADER,
            CDC_BCD_VERSION as u8,
            (CDC_BCD_VERSION >> 8) as u8,
        ],
    );
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_CALL_MANAGEMENT, 0x00, data_if]);
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_ACM, ACM_CAPABILITY_LINE_CODING]);
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_UNION, comm_if.into(), data_if]);
    let notify = alt.endpoint_interrupt_in(NOTIFY_PACKET as u16, 255);

    let mut iface = func.interface();
    let mut alt = iface.alt_setting(USB_CLASS_CDC_DATA, 0x00, 0x00, None);
    let data_out = alt.endpoint_bulk_out(MAX_PACKET as u16);
    let data_in = alt.endpoint_bulk_in(MAX_PACKET as u16);

    CdcPort {
        notify,
        data_in,
        data_out,
    }
}

/// Bus lifecycle and class-request handler, shared across all three
/// ports; requests are routed by wIndex (the interface number).
pub struct UsbControl {
    shared: &'static SharedCell,
    configured: bool,
}

impl UsbControl {
    pub fn new(shared: &'static SharedCell) -> Self {
        Self {
            shared,
            configured: false,
        }
    }

    /// A class request addressed to one of our communication interfaces.
    fn own_request(req: &Request) -> Option<u8> {
        if req.request_type != RequestType::Class || req.recipient != Recipient::Interface {
            return None;
        }
        let interface = req.index as u8;
        interface_port(interface).map(|_| interface)
    }
}

impl Handler for UsbControl {
    fn reset(&mut self) {
        self.configured = false;
        with_shared(self.shared, |s| s.device.usb_reset());
    }

    fn configured(&mut self, configured: bool) {
        self.configured = configured;
        with_shared(self.shared, |s| {
            let Shared { device, hal, .. } = s;
            if configured {
                device.usb_configured(hal);
            } else {
                device.usb_suspend(hal);
            }
        });
    }

    fn suspended(&mut self, suspended: bool) {
        if !self.configured {
            return;
        }
        with_shared(self.shared, |s| {
            let Shared { device, hal, .. } = s;
            if suspended {
                device.usb_suspend(hal);
            } else {
                device.usb_configured(hal);
            }
        });
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        let interface = Self::own_request(&req)?;
        let Some(request) = cdc_proto::Request::from_u8(req.request) else {
            return Some(OutResponse::Rejected);
        };
        let accepted = with_shared(self.shared, |s| {
            let Shared { device, hal, .. } = s;
            match request {
                cdc_proto::Request::SetLineCoding => {
                    device.set_line_coding(hal, interface, data).is_ok()
                }
                cdc_proto::Request::SetControlLineState => device
                    .set_control_line_state(hal, interface, req.value)
                    .is_ok(),
                // no break signal on this hardware; acknowledge and move on
                cdc_proto::Request::SendBreak => true,
                cdc_proto::Request::GetLineCoding => false,
            }
        });
        Some(if accepted {
            OutResponse::Accepted
        } else {
            OutResponse::Rejected
        })
    }

    fn control_in<'a>(&mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        let interface = Self::own_request(&req)?;
        if cdc_proto::Request::from_u8(req.request) != Some(cdc_proto::Request::GetLineCoding) {
            return Some(InResponse::Rejected);
        }
        let coding = with_shared(self.shared, |s| s.device.get_line_coding(interface));
        match coding {
            Some(encoded) if buf.len() >= encoded.len() => {
                buf[..encoded.len()].copy_from_slice(&encoded);
                Some(InResponse::Accepted(&buf[..encoded.len()]))
            }
            _ => Some(InResponse::Rejected),
        }
    }
}
