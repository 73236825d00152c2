//! Simulated chip and timer sharing one clock.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Error, ErrorKind, ErrorType, Operation, SpiDevice};

use crate::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// State shared by [`MockSpi`] and [`MockTimer`].
pub struct Bench {
    now: Cell<u64>,
    transfer_ns: u64,
    fail_at: Cell<Option<usize>>,
    samples: RefCell<VecDeque<u16>>,
    frames: RefCell<Vec<u16>>,
    delays: RefCell<Vec<u32>>,
}

impl Bench {
    /// A chip whose conversions each take `transfer_ns` of simulated time.
    pub fn new(transfer_ns: u64) -> Self {
        Self {
            now: Cell::new(0),
            transfer_ns,
            fail_at: Cell::new(None),
            samples: RefCell::new(VecDeque::new()),
            frames: RefCell::new(Vec::new()),
            delays: RefCell::new(Vec::new()),
        }
    }

    /// Queues conversion results. Once exhausted the chip reads 0.
    pub fn script(&self, samples: impl IntoIterator<Item = u16>) {
        self.samples.borrow_mut().extend(samples);
    }

    /// Fails the transaction with the given zero based index.
    pub fn fail_at(&self, transaction: usize) {
        self.fail_at.set(Some(transaction));
    }

    pub fn spi(&self) -> MockSpi<'_> {
        MockSpi(self)
    }

    pub fn timer(&self) -> MockTimer<'_> {
        MockTimer(self)
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn frames(&self) -> Vec<u16> {
        self.frames.borrow().clone()
    }

    pub fn transfers(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }
}

pub struct MockSpi<'a>(&'a Bench);

impl ErrorType for MockSpi<'_> {
    type Error = MockError;
}

impl SpiDevice for MockSpi<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        assert_eq!(operations.len(), 1, "one conversion per transaction");

        let bench = self.0;

        if bench.fail_at.get() == Some(bench.transfers()) {
            return Err(MockError);
        }

        match &mut operations[0] {
            Operation::TransferInPlace(words) => {
                assert_eq!(words.len(), 3);
                assert_eq!(words[2], 0, "padding byte must be clear");

                let frame = u16::from_be_bytes([words[0], words[1]]);

                assert_eq!(frame >> 10, 1, "missing start flag");

                bench.frames.borrow_mut().push(frame);

                let sample = bench.samples.borrow_mut().pop_front().unwrap_or(0);

                // Undefined high bits, null bit and then the result.
                let [high, low] = (0b1110_0000_0000_0000 | (sample & 0x0FFF)).to_be_bytes();

                words[0] = 0xFF;
                words[1] = high;
                words[2] = low;
            }
            _ => panic!("Not an expected operation"),
        }

        bench.now.set(bench.now.get() + bench.transfer_ns);

        Ok(())
    }
}

pub struct MockTimer<'a>(&'a Bench);

impl Clock for MockTimer<'_> {
    fn now_ns(&mut self) -> u64 {
        self.0.now.get()
    }
}

impl DelayNs for MockTimer<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.0.delays.borrow_mut().push(ns);
        self.0.now.set(self.0.now.get() + u64::from(ns));
    }
}
