//! 位流读写
//!
//! 字节内按高位在前（MSB-first）的顺序读写，游标只前进不回退。

/// 载荷位读取器
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 已读取的位数
    position: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// 总位数
    pub fn bit_len(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// 已消耗的位数
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 剩余位数
    pub fn remaining(&self) -> u64 {
        self.bit_len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// 读取 `width` 位组成的整数（高位在前）
    ///
    /// 剩余位数不足时在右侧补零，返回 `(值, 实际消耗的位数)`。
    /// `width` 最大为 32。
    pub fn read(&mut self, width: u32) -> (u64, u32) {
        debug_assert!(width <= 32);
        let take = (width as u64).min(self.remaining()) as u32;
        let mut value = 0u64;
        for _ in 0..take {
            let byte = self.data[(self.position / 8) as usize];
            let bit = (byte >> (7 - (self.position % 8))) & 1;
            value = (value << 1) | bit as u64;
            self.position += 1;
        }
        // 右侧补零
        value <<= width - take;
        (value, take)
    }
}

/// 载荷位写入器
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的位数
    pub fn bit_len(&self) -> u64 {
        self.bit_len
    }

    /// 写入 `value` 的低 `width` 位（高位在前）
    pub fn write(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        for i in (0..width).rev() {
            let bit = ((value >> i) & 1) as u8;
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            if bit == 1 {
                if let Some(last) = self.bytes.last_mut() {
                    *last |= 1 << (7 - (self.bit_len % 8));
                }
            }
            self.bit_len += 1;
        }
    }

    /// 取出字节，末尾不足一字节的部分以零填充
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_msb_first() {
        let data = [0b1011_0010, 0b0100_0000];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.bit_len(), 16);

        assert_eq!(reader.read(3), (0b101, 3));
        assert_eq!(reader.read(5), (0b10010, 5));
        assert_eq!(reader.read(2), (0b01, 2));
        assert_eq!(reader.position(), 10);
        assert_eq!(reader.remaining(), 6);
    }

    #[test]
    fn test_read_pads_on_the_right() {
        let data = [0x41];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(4), (0b0100, 4));
        assert_eq!(reader.read(3), (0b000, 3));
        // 只剩 1 位，补两个零
        assert_eq!(reader.read(3), (0b100, 1));
        assert!(reader.is_exhausted());
        assert_eq!(reader.read(5), (0, 0));
    }

    #[test]
    fn test_empty_reader() {
        let reader = BitReader::new(&[]);
        assert!(reader.is_exhausted());
        assert_eq!(reader.bit_len(), 0);
    }

    #[test]
    fn test_writer_packs_bits() {
        let mut writer = BitWriter::new();
        writer.write(0b0100, 4);
        writer.write(0b0, 1);
        writer.write(0b001, 3);
        assert_eq!(writer.bit_len(), 8);
        writer.write(0b11, 2);
        assert_eq!(writer.bit_len(), 10);
        assert_eq!(writer.into_bytes(), vec![0x41, 0b1100_0000]);
    }

    #[test]
    fn test_writer_reads_back() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0x01];
        let mut reader = BitReader::new(&data);
        let mut writer = BitWriter::new();
        for width in [5, 3, 7, 1, 6, 2, 4, 4, 8] {
            let (value, taken) = reader.read(width);
            assert_eq!(taken, width);
            writer.write(value, width);
        }
        assert!(reader.is_exhausted());
        assert_eq!(writer.into_bytes(), data.to_vec());
    }
}
