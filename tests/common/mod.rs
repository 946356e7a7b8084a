// In-process FINS/TCP PLC used by the integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fins_engine::{PlcFamily, SessionConfig};

pub const CLIENT_NODE: u8 = 0xEF;
pub const SERVER_NODE: u8 = 0x0A;

pub const CIO: usize = 0;
pub const W: usize = 1;
pub const DM: usize = 2;

// Index registers hold 4 bytes each and start at wire word 0x0100.
const IR_AREA: u8 = 0xDC;
const IR_BASE: usize = 0x0100;

// Configures different ways the PLC should behave.
pub struct PlcOpts {
    pub model: &'static str,
    // Answer with a SID that does not match the request.
    pub corrupt_sid: bool,
    // End code put in every response.
    pub end_code: Option<u16>,
    // Drop the connection after reading the next request.
    pub close: bool,
    // Answer the next request with this wrapper error instead of a frame.
    pub wrapper_error: Option<u32>,
    // Reject handshakes with this wrapper error.
    pub reject_handshake: Option<u32>,
    // Answer the next request with a frame too short for a FINS header.
    pub short_frame: bool,
}

impl Default for PlcOpts {
    fn default() -> Self {
        Self {
            model: "CJ2M-CPU33",
            corrupt_sid: false,
            end_code: None,
            close: false,
            wrapper_error: None,
            reject_handshake: None,
            short_frame: false,
        }
    }
}

// A request as seen by the PLC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mrc: u8,
    pub src: u8,
    pub body: Vec<u8>,
}

pub struct PlcState {
    pub opts: PlcOpts,
    pub requests: Vec<Request>,
    pub handshakes: usize,
    pub banks: [Vec<u16>; 3],
    pub forced: [Vec<u16>; 3],
    pub registers: [u32; 16],
    pub mode: Option<u8>,
}

pub struct MockPlc {
    port: u16,
    state: Arc<Mutex<PlcState>>,
}

impl MockPlc {
    pub fn start() -> Self {
        let state = Arc::new(Mutex::new(PlcState {
            opts: PlcOpts::default(),
            requests: Vec::new(),
            handshakes: 0,
            banks: [vec![0; 0x1_0000], vec![0; 0x1_0000], vec![0; 0x1_0000]],
            forced: [vec![0; 0x1_0000], vec![0; 0x1_0000], vec![0; 0x1_0000]],
            registers: [0; 16],
            mode: None,
        }));

        let socket = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let server_state = state.clone();
        thread::spawn(move || {
            for client in socket.incoming().flatten() {
                // One client at a time is enough.
                handle_client(&server_state, client);
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    // Session config for a CS/CJ PLC behind this mock.
    pub fn config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1", 0, 0)
            .with_port(self.port)
            .with_plc_family(PlcFamily::CsCj)
            .with_recv_timeout(Duration::from_secs(2))
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut PlcState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn opts(&self, f: impl FnOnce(&mut PlcOpts)) {
        self.with(|s| f(&mut s.opts));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.with(|s| s.requests.clone())
    }

    pub fn words(&self, bank: usize, start: usize, count: usize) -> Vec<u16> {
        self.with(|s| s.banks[bank][start..start + count].to_vec())
    }

    pub fn set_words(&self, bank: usize, start: usize, words: &[u16]) {
        self.with(|s| s.banks[bank][start..start + words.len()].copy_from_slice(words));
    }
}

// Maps an area code onto one of the simulated banks.
fn bank(area_code: u8) -> usize {
    match area_code & 0x0F {
        0x00 => CIO,
        0x01 => W,
        _ => DM,
    }
}

fn is_word_area(area_code: u8) -> bool {
    area_code & 0x80 != 0
}

fn is_forced_area(area_code: u8) -> bool {
    area_code & 0x40 != 0
}

fn handle_client(state: &Arc<Mutex<PlcState>>, mut socket: TcpStream) {
    let mut hello = [0u8; 20];
    if socket.read_exact(&mut hello).is_err() {
        return;
    }
    let reject = {
        let mut state = state.lock().unwrap();
        state.handshakes += 1;
        state.opts.reject_handshake
    };
    let mut reply = Vec::with_capacity(24);
    reply.extend_from_slice(b"FINS");
    reply.extend_from_slice(&16u32.to_be_bytes());
    match reject {
        Some(error) => {
            reply.extend_from_slice(&3u32.to_be_bytes());
            reply.extend_from_slice(&error.to_be_bytes());
        }
        None => {
            reply.extend_from_slice(&1u32.to_be_bytes());
            reply.extend_from_slice(&0u32.to_be_bytes());
        }
    }
    reply.extend_from_slice(&[0, 0, 0, CLIENT_NODE, 0, 0, 0, SERVER_NODE]);
    if socket.write_all(&reply).is_err() || reject.is_some() {
        return;
    }

    loop {
        let mut wrapper = [0u8; 16];
        if socket.read_exact(&mut wrapper).is_err() {
            // connection was closed
            return;
        }
        let length = u32::from_be_bytes([wrapper[4], wrapper[5], wrapper[6], wrapper[7]]) as usize - 8;
        let mut frame = vec![0u8; length];
        if socket.read_exact(&mut frame).is_err() {
            return;
        }

        let mut state = state.lock().unwrap();
        let request = Request {
            mrc: frame[10],
            src: frame[11],
            body: frame[12..].to_vec(),
        };
        state.requests.push(request.clone());

        if state.opts.close {
            state.opts.close = false;
            return;
        }
        if let Some(error) = state.opts.wrapper_error.take() {
            let mut reply = Vec::with_capacity(16);
            reply.extend_from_slice(b"FINS");
            reply.extend_from_slice(&8u32.to_be_bytes());
            reply.extend_from_slice(&3u32.to_be_bytes());
            reply.extend_from_slice(&error.to_be_bytes());
            if socket.write_all(&reply).is_err() {
                return;
            }
            continue;
        }

        if state.opts.short_frame {
            state.opts.short_frame = false;
            let mut reply = Vec::with_capacity(20);
            reply.extend_from_slice(b"FINS");
            reply.extend_from_slice(&12u32.to_be_bytes());
            reply.extend_from_slice(&2u32.to_be_bytes());
            reply.extend_from_slice(&0u32.to_be_bytes());
            reply.extend_from_slice(&[0xC0, 0x00, 0x02, 0x00]);
            if socket.write_all(&reply).is_err() {
                return;
            }
            continue;
        }

        let end_code = state.opts.end_code;
        let (end_code, data) = match end_code {
            Some(code) => (code, Vec::new()),
            None => state.execute(&request),
        };

        let mut header = [0u8; 12];
        header[0] = 0xC0;
        header[2] = 0x02;
        // swap destination and source
        header[3..6].copy_from_slice(&frame[6..9]);
        header[6..9].copy_from_slice(&frame[3..6]);
        header[9] = if state.opts.corrupt_sid {
            frame[9].wrapping_add(1)
        } else {
            frame[9]
        };
        header[10] = frame[10];
        header[11] = frame[11];

        let mut reply = Vec::with_capacity(16 + 14 + data.len());
        reply.extend_from_slice(b"FINS");
        reply.extend_from_slice(&((8 + 12 + 2 + data.len()) as u32).to_be_bytes());
        reply.extend_from_slice(&2u32.to_be_bytes());
        reply.extend_from_slice(&0u32.to_be_bytes());
        reply.extend_from_slice(&header);
        reply.extend_from_slice(&end_code.to_be_bytes());
        reply.extend_from_slice(&data);
        if socket.write_all(&reply).is_err() {
            return;
        }
    }
}

fn be16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

impl PlcState {
    fn execute(&mut self, request: &Request) -> (u16, Vec<u8>) {
        let body = &request.body;
        match (request.mrc, request.src) {
            (0x01, 0x01) => (0, self.read(&body[..4], be16(&body[4..]) as usize)),
            (0x01, 0x02) => {
                self.write(&body[..4], be16(&body[4..]) as usize, &body[6..]);
                (0, Vec::new())
            }
            (0x01, 0x03) => {
                let value = be16(&body[6..]);
                let start = be16(&body[1..]) as usize;
                let count = be16(&body[4..]) as usize;
                self.banks[bank(body[0])][start..start + count].fill(value);
                (0, Vec::new())
            }
            (0x01, 0x04) => {
                let mut data = Vec::new();
                for item in body.chunks_exact(4) {
                    data.push(item[0]);
                    data.extend(self.read_one(item));
                }
                (0, data)
            }
            (0x01, 0x05) => {
                let from = be16(&body[1..]) as usize;
                let to = be16(&body[5..]) as usize;
                let count = be16(&body[8..]) as usize;
                let words = self.banks[bank(body[0])][from..from + count].to_vec();
                self.banks[bank(body[4])][to..to + count].copy_from_slice(&words);
                (0, Vec::new())
            }
            (0x04, 0x01) => {
                self.mode = Some(body[2]);
                (0, Vec::new())
            }
            (0x04, 0x02) => {
                self.mode = None;
                (0, Vec::new())
            }
            (0x05, 0x01) => {
                let mut data = vec![b' '; 40];
                data[..self.opts.model.len()].copy_from_slice(self.opts.model.as_bytes());
                data[20..28].copy_from_slice(b"02.01\0\0\0");
                data.resize(160, 0);
                (0, data)
            }
            (0x23, 0x01) => {
                let count = be16(body) as usize;
                for item in body[2..].chunks_exact(6).take(count) {
                    self.force(be16(item), &item[2..]);
                }
                (0, Vec::new())
            }
            (0x23, 0x02) => {
                for bank in &mut self.forced {
                    bank.fill(0);
                }
                (0, Vec::new())
            }
            // undefined command
            _ => (0x0401, Vec::new()),
        }
    }

    fn bit(&self, bank: usize, cursor: usize) -> bool {
        self.banks[bank][cursor / 16] & (1 << (cursor % 16)) != 0
    }

    fn set_bit(&mut self, bank: usize, cursor: usize, value: bool) {
        let word = &mut self.banks[bank][cursor / 16];
        if value {
            *word |= 1 << (cursor % 16);
        } else {
            *word &= !(1 << (cursor % 16));
        }
    }

    fn read(&self, address: &[u8], count: usize) -> Vec<u8> {
        let bank = bank(address[0]);
        let word = be16(&address[1..]) as usize;
        if address[0] == IR_AREA {
            let start = word - IR_BASE;
            return self.registers[start..start + count]
                .iter()
                .flat_map(|r| r.to_be_bytes())
                .collect();
        }
        if is_word_area(address[0]) {
            self.banks[bank][word..word + count]
                .iter()
                .flat_map(|w| w.to_be_bytes())
                .collect()
        } else {
            let start = word * 16 + address[3] as usize;
            (start..start + count).map(|c| u8::from(self.bit(bank, c))).collect()
        }
    }

    fn write(&mut self, address: &[u8], count: usize, data: &[u8]) {
        let bank = bank(address[0]);
        let word = be16(&address[1..]) as usize;
        if address[0] == IR_AREA {
            for (i, r) in data.chunks_exact(4).take(count).enumerate() {
                self.registers[word - IR_BASE + i] = u32::from_be_bytes([r[0], r[1], r[2], r[3]]);
            }
            return;
        }
        if is_word_area(address[0]) {
            for (i, w) in data.chunks_exact(2).take(count).enumerate() {
                self.banks[bank][word + i] = be16(w);
            }
        } else {
            let start = word * 16 + address[3] as usize;
            for (i, &b) in data.iter().take(count).enumerate() {
                self.set_bit(bank, start + i, b & 0x01 != 0);
            }
        }
    }

    // Value of one multiple read item, without its area code.
    fn read_one(&self, item: &[u8]) -> Vec<u8> {
        let bank = bank(item[0]);
        let word = be16(&item[1..]) as usize;
        if item[0] == IR_AREA {
            return self.registers[word - IR_BASE].to_be_bytes().to_vec();
        }
        match (is_word_area(item[0]), is_forced_area(item[0])) {
            (true, false) => self.banks[bank][word].to_be_bytes().to_vec(),
            (true, true) => {
                let mut out = self.forced[bank][word].to_be_bytes().to_vec();
                out.extend(self.banks[bank][word].to_be_bytes());
                out
            }
            (false, forced) => {
                let cursor = word * 16 + item[3] as usize;
                let mut value = u8::from(self.bit(bank, cursor));
                if forced && self.forced[bank][word] & (1 << item[3]) != 0 {
                    value |= 0x02;
                }
                vec![value]
            }
        }
    }

    fn force(&mut self, action: u16, address: &[u8]) {
        let bank = bank(address[0]);
        let word = be16(&address[1..]) as usize;
        let bit = address[3] as usize;
        let mask = 1u16 << bit;
        let cursor = word * 16 + bit;
        match action {
            0x0000 | 0x0001 => {
                self.forced[bank][word] |= mask;
                self.set_bit(bank, cursor, action == 0x0001);
            }
            0x8000 | 0x8001 => {
                self.forced[bank][word] &= !mask;
                self.set_bit(bank, cursor, action == 0x8001);
            }
            _ => self.forced[bank][word] &= !mask,
        }
    }
}
