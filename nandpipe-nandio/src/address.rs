use bitfield::bitfield;
use byteorder::{ByteOrder, LittleEndian};

/// Page size of legacy small-page devices
pub const SMALL_PAGE_SIZE: u32 = 512;
/// Upper bound of column + row address cycles
pub const MAX_ADDRESS_CYCLES: usize = 5;
/// Upper bound of row address cycles
pub const MAX_ROW_CYCLES: usize = 3;

bitfield! {
    /// Address for NAND
    ///
    /// Read/Program (large page)
    /// |              | IO7  | IO6  | IO5  | IO4  | IO3  | IO2  | IO1  | IO0  |
    /// | ------------ | ---  | ---  | ---  | ---  | ---  | ---  | ---  | ---  |
    /// | First Cycle  | CA7  | CA6  | CA5  | CA4  | CA3  | CA2  | CA1  | CA0  |
    /// | Second Cycle | CA15 | CA14 | CA13 | CA12 | CA11 | CA10 | CA9  | CA8  |
    /// | Third Cycle  | RA7  | RA6  | RA5  | RA4  | RA3  | RA2  | RA1  | RA0  |
    /// | Fourth Cycle | RA15 | RA14 | RA13 | RA12 | RA11 | RA10 | RA9  | RA8  |
    /// | Fifth Cycle  | RA23 | RA22 | RA21 | RA20 | RA19 | RA18 | RA17 | RA16 |
    ///
    /// Small page devices (512 byte) only drive the first column cycle.
    /// Block Erase only drives the row cycles.
    ///
    /// CAx: Column Address
    /// RAx: Row (Page) Address
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct NandAddress(u64);
    pub u16, column, set_column: 15, 0;
    pub u32, row, set_row: 39, 16;
}

/// Address bytes in bus order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressCycles {
    bytes: [u8; MAX_ADDRESS_CYCLES],
    len: usize,
}

impl AddressCycles {
    fn push(&mut self, data: &[u8]) {
        let end = self.len + data.len();
        self.bytes[self.len..end].copy_from_slice(data);
        self.len = end;
    }

    /// Cycles to drive, first cycle first
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl NandAddress {
    /// Create an address from column and row
    pub fn new(column: u16, row: u32) -> Self {
        let mut addr = Self::default();
        addr.set_column(column);
        addr.set_row(row);
        addr
    }

    /// Number of column cycles for the page size
    pub fn column_cycles(page_size: u32) -> usize {
        if page_size <= SMALL_PAGE_SIZE {
            1
        } else {
            2
        }
    }

    /// Pack column and row cycles
    pub fn to_cycles(&self, page_size: u32, row_cycles: usize) -> AddressCycles {
        let mut column = [0u8; 2];
        LittleEndian::write_u16(&mut column, self.column());

        let mut cycles = AddressCycles::default();
        cycles.push(&column[..Self::column_cycles(page_size)]);
        cycles.push(self.row_bytes(row_cycles).as_slice());
        cycles
    }

    /// Pack only the row cycles (Block Erase)
    pub fn to_row_cycles(&self, row_cycles: usize) -> AddressCycles {
        self.row_bytes(row_cycles)
    }

    /// Pack only the column cycles (Random Data In/Out)
    pub fn to_column_cycles(&self, page_size: u32) -> AddressCycles {
        let mut column = [0u8; 2];
        LittleEndian::write_u16(&mut column, self.column());

        let mut cycles = AddressCycles::default();
        cycles.push(&column[..Self::column_cycles(page_size)]);
        cycles
    }

    fn row_bytes(&self, row_cycles: usize) -> AddressCycles {
        let mut row = [0u8; 4];
        LittleEndian::write_u32(&mut row, self.row());

        let mut cycles = AddressCycles::default();
        cycles.push(&row[..row_cycles.min(MAX_ROW_CYCLES)]);
        cycles
    }
}
