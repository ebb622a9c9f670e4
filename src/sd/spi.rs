use log::{debug, trace, warn};

use super::image::SdVolume;

const CMD_GO_IDLE: u8 = 0x40;
const CMD_SEND_OP_COND: u8 = 0x41;
const CMD_SEND_IF_COND: u8 = 0x48;
const CMD_STOP_TRANSMISSION: u8 = 0x4C;
const CMD_READ_BLOCK: u8 = 0x51;
const CMD_MULTI_READ_BLOCK: u8 = 0x52;
const CMD_WRITE_BLOCK: u8 = 0x58;
const ACMD_SEND_OP_COND: u8 = 0x69;
const CMD_APP_CMD: u8 = 0x77;
const CMD_READ_OCR: u8 = 0x7A;

const BLOCK_SIZE: u32 = 512;
const MULTI_BLOCK_DELAY: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ArgXHi,
    ArgXLo,
    ArgYHi,
    ArgYLo,
    ArgCrc,
    RespondSingle,
    RespondMulti,
    ReadSingleBlock,
    ReadMultipleBlock,
    WriteSingle,
    WriteSingleBlock,
}

/// The SD SPI-mode command/response/block-transfer state machine
/// (spec.md §4.4), driven one full-duplex byte at a time.
///
/// Grounded on `SDEmulator.cpp: SDEmu::handleSpiByte` line for line,
/// including the `02 05` default-response quirk and the in-band CMD12
/// detection inside `READ_MULTIPLE_BLOCK` — both preserved per spec.md §9.
pub struct SdSpiEngine {
    state: State,
    command: u8,
    arg_x_hi: u8,
    arg_x_lo: u8,
    arg_y_hi: u8,
    arg_y_lo: u8,
    arg: u32,

    response: Vec<u8>,
    response_pos: usize,
    block_bytes: u32,
    delay: u32,
    selected: bool,
}

impl SdSpiEngine {
    pub fn new() -> Self {
        SdSpiEngine {
            state: State::Idle,
            command: 0,
            arg_x_hi: 0,
            arg_x_lo: 0,
            arg_y_hi: 0,
            arg_y_lo: 0,
            arg: 0,
            response: Vec::new(),
            response_pos: 0,
            block_bytes: 0,
            delay: 0,
            selected: false,
        }
    }

    pub fn chip_select_changed(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn handle_spi_byte(&mut self, input: u8, volume: &mut SdVolume) -> u8 {
        trace!("sd spi byte in={input:#04x} state={:?}", self.state);
        match self.state {
            State::Idle => self.idle(input),
            State::ArgXHi => {
                self.arg_x_hi = input;
                self.state = State::ArgXLo;
                0x00
            }
            State::ArgXLo => {
                self.arg_x_lo = input;
                self.state = State::ArgYHi;
                0x00
            }
            State::ArgYHi => {
                self.arg_y_hi = input;
                self.state = State::ArgYLo;
                0x00
            }
            State::ArgYLo => {
                self.arg_y_lo = input;
                self.state = State::ArgCrc;
                0x00
            }
            State::ArgCrc => {
                self.arg = u32::from_be_bytes([self.arg_x_hi, self.arg_x_lo, self.arg_y_hi, self.arg_y_lo]);
                self.dispatch(volume)
            }
            State::RespondSingle => self.respond_single(),
            State::RespondMulti => self.respond_multi(),
            State::ReadSingleBlock => self.read_single_block(volume),
            State::ReadMultipleBlock => self.read_multiple_block(input, volume),
            State::WriteSingle => self.write_single(),
            State::WriteSingleBlock => self.write_single_block(input),
        }
    }

    fn idle(&mut self, input: u8) -> u8 {
        if input == 0xFF {
            return 0xFF;
        }
        self.command = input;
        self.state = State::ArgXHi;
        0x00
    }

    fn dispatch(&mut self, volume: &mut SdVolume) -> u8 {
        debug!("sd command dispatch opcode={:#04x} arg={:#010x}", self.command, self.arg);
        self.response_pos = 0;
        self.block_bytes = 0;

        match self.command {
            CMD_GO_IDLE => self.respond(vec![0xFF, 0x01]),
            CMD_SEND_OP_COND => self.respond(vec![0x00, 0x00]),
            CMD_SEND_IF_COND => self.respond(vec![0xFF, 0x01, 0x00, 0x00, 0x01, self.arg_y_lo]),
            CMD_STOP_TRANSMISSION => self.respond(vec![0xFF, 0xFF, 0x00]),
            CMD_READ_BLOCK => {
                volume.seek(self.arg);
                self.block_bytes = BLOCK_SIZE;
                self.respond(vec![0xFF, 0x00, 0xFE])
            }
            CMD_MULTI_READ_BLOCK => {
                volume.seek(self.arg);
                self.delay = 0;
                self.state = State::RespondMulti;
                self.response = vec![0xFF, 0x00, 0xFE];
                0x00
            }
            CMD_WRITE_BLOCK => {
                warn!("CMD24 write to block {} acknowledged but discarded (no write-back support)", self.arg / BLOCK_SIZE);
                volume.seek(self.arg);
                self.block_bytes = BLOCK_SIZE;
                self.state = State::WriteSingle;
                self.response = vec![0x00, 0x00, 0xFE];
                0x00
            }
            ACMD_SEND_OP_COND => self.respond(vec![0xFF, 0x00]),
            CMD_APP_CMD => self.respond(vec![0xFF, 0x01]),
            CMD_READ_OCR => self.respond(vec![0xFF, 0x00, 0x80, 0xFF, 0x80, 0x00]),
            other => {
                warn!("unknown SD command opcode {other:#04x}");
                self.respond(vec![0x02, 0x05])
            }
        }
    }

    /// Parks the engine in `RespondSingle` and arms the response buffer, but
    /// the CRC byte that triggered dispatch always acks with `0x00` — the
    /// buffer itself is only consumed starting with the *next* exchange.
    fn respond(&mut self, buffer: Vec<u8>) -> u8 {
        self.state = State::RespondSingle;
        self.response = buffer;
        self.response_pos = 0;
        0x00
    }

    fn respond_single(&mut self) -> u8 {
        if self.response_pos < self.response.len() {
            let byte = self.response[self.response_pos];
            self.response_pos += 1;
            if self.response_pos == self.response.len() {
                self.state = if self.block_bytes > 0 { State::ReadSingleBlock } else { State::Idle };
            }
            byte
        } else {
            self.state = State::Idle;
            0xFF
        }
    }

    fn read_single_block(&mut self, volume: &mut SdVolume) -> u8 {
        let byte = volume.read_byte();
        self.block_bytes -= 1;
        if self.block_bytes == 0 {
            self.response = vec![0x00, 0x00];
            self.response_pos = 0;
            self.state = State::RespondSingle;
        }
        byte
    }

    fn respond_multi(&mut self) -> u8 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0xFF;
        }

        let byte = self.response[self.response_pos];
        self.response_pos += 1;
        if byte == 0 && self.block_bytes == 0 {
            self.delay = MULTI_BLOCK_DELAY;
        }
        if self.response_pos == self.response.len() {
            self.block_bytes = BLOCK_SIZE;
            self.state = State::ReadMultipleBlock;
        }
        byte
    }

    fn read_multiple_block(&mut self, input: u8, volume: &mut SdVolume) -> u8 {
        if input == CMD_STOP_TRANSMISSION {
            self.command = CMD_STOP_TRANSMISSION;
            self.state = State::ArgXHi;
            return 0x00;
        }

        let byte = volume.read_byte();
        self.block_bytes -= 1;
        if self.block_bytes == 0 {
            self.response = vec![0x00, 0x00, 0xFF, 0xFF, 0xFE];
            self.response_pos = 0;
            self.arg = self.arg.wrapping_add(BLOCK_SIZE);
            volume.seek(self.arg);
            self.block_bytes = BLOCK_SIZE;
            self.state = State::RespondMulti;
        }
        byte
    }

    fn write_single(&mut self) -> u8 {
        if self.response_pos < self.response.len() {
            let byte = self.response[self.response_pos];
            self.response_pos += 1;
            if self.response_pos == self.response.len() {
                self.state = if self.block_bytes > 0 { State::WriteSingleBlock } else { State::Idle };
            }
            byte
        } else {
            self.state = State::Idle;
            0xFF
        }
    }

    fn write_single_block(&mut self, _input: u8) -> u8 {
        self.block_bytes -= 1;
        if self.block_bytes == 0 {
            self.response = vec![0x00, 0x00];
            self.response_pos = 0;
            self.state = State::RespondSingle;
        }
        0xFF
    }
}
