//! Binary C3D decoder
//!
//! Layout handled here:
//! - 512-byte header block (point count, analog words, frame bounds, scale, rate)
//! - parameter section (groups and typed, dimensioned parameters)
//! - interleaved point/analog data section, integer or float storage
//!
//! Number encoding follows the processor byte of the parameter section:
//! Intel (little-endian IEEE), DEC (little-endian words, VAX floats) or
//! MIPS (big-endian IEEE).

use super::param::{ParamValue, ParameterMap};
use super::{
    CaptureDecoder, DecodedCapture, HeaderMaps, GROUP_ANALOG, GROUP_POINT, HEADER_FIRST_FRAME,
    HEADER_FRAME_RATE, HEADER_LAST_FRAME, HEADER_SIZE,
};
use crate::error::{GallopError, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use ndarray::{Array2, Array3};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

const BLOCK_SIZE: u64 = 512;
const C3D_KEY: u8 = 0x50;

/// Residual written to the w axis for markers flagged invalid.
pub const INVALID_RESIDUAL: f64 = -1.0;

/// Number encoding declared by the parameter section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Processor {
    Intel,
    Dec,
    Mips,
}

impl Processor {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            84 => Ok(Processor::Intel),
            85 => Ok(Processor::Dec),
            86 => Ok(Processor::Mips),
            other => Err(GallopError::decode(format!("unknown processor type {other}"))),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Processor::Intel => 84,
            Processor::Dec => 85,
            Processor::Mips => 86,
        }
    }
}

/// Cursor over the file bytes that reads words in the file's encoding.
struct WordReader<'a> {
    cursor: Cursor<&'a [u8]>,
    processor: Processor,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8], processor: Processor) -> Self {
        WordReader {
            cursor: Cursor::new(bytes),
            processor,
        }
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(GallopError::decode(format!(
                "offset {pos} is past the end of the file ({} bytes)",
                self.len()
            )));
        }
        self.cursor.set_position(pos);
        Ok(())
    }

    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    fn truncated(&self) -> GallopError {
        GallopError::decode(format!("unexpected end of data at byte {}", self.position()))
    }

    /// Fail before allocating for `size` bytes the file does not hold.
    fn ensure_remaining(&self, size: usize) -> Result<()> {
        if size as u64 > self.remaining() {
            return Err(GallopError::decode(format!(
                "{size} bytes requested at byte {} but only {} remain",
                self.position(),
                self.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.truncated())
    }

    fn i8(&mut self) -> Result<i8> {
        self.cursor.read_i8().map_err(|_| self.truncated())
    }

    fn i16(&mut self) -> Result<i16> {
        let value = match self.processor {
            Processor::Mips => self.cursor.read_i16::<BigEndian>(),
            Processor::Intel | Processor::Dec => self.cursor.read_i16::<LittleEndian>(),
        };
        value.map_err(|_| self.truncated())
    }

    fn u16(&mut self) -> Result<u16> {
        let value = match self.processor {
            Processor::Mips => self.cursor.read_u16::<BigEndian>(),
            Processor::Intel | Processor::Dec => self.cursor.read_u16::<LittleEndian>(),
        };
        value.map_err(|_| self.truncated())
    }

    fn f32(&mut self) -> Result<f32> {
        match self.processor {
            Processor::Intel => self
                .cursor
                .read_f32::<LittleEndian>()
                .map_err(|_| self.truncated()),
            Processor::Mips => self
                .cursor
                .read_f32::<BigEndian>()
                .map_err(|_| self.truncated()),
            Processor::Dec => {
                let mut raw = [0u8; 4];
                self.cursor
                    .read_exact(&mut raw)
                    .map_err(|_| self.truncated())?;
                Ok(dec_to_ieee(raw))
            }
        }
    }

    fn bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(count)?;
        let mut buf = vec![0u8; count];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| self.truncated())?;
        Ok(buf)
    }
}

/// VAX F-float to IEEE single: swap the 16-bit words, then undo the
/// two-step exponent bias difference.
fn dec_to_ieee(raw: [u8; 4]) -> f32 {
    if raw == [0; 4] {
        return 0.0;
    }
    f32::from_le_bytes([raw[2], raw[3], raw[0], raw[1]]) / 4.0
}

/// Fixed fields of the header block.
#[derive(Clone, Debug)]
struct RawHeader {
    point_count: u16,
    analog_words_per_frame: u16,
    first_frame: u16,
    last_frame: u16,
    scale: f32,
    data_start: u16,
    analog_samples_per_frame: u16,
    frame_rate: f32,
}

fn read_header(reader: &mut WordReader) -> Result<RawHeader> {
    reader.seek(2)?;
    let point_count = reader.u16()?;
    let analog_words_per_frame = reader.u16()?;
    let first_frame = reader.u16()?;
    let last_frame = reader.u16()?;
    let _max_gap = reader.u16()?;
    let scale = reader.f32()?;
    let data_start = reader.u16()?;
    let analog_samples_per_frame = reader.u16()?;
    let frame_rate = reader.f32()?;

    Ok(RawHeader {
        point_count,
        analog_words_per_frame,
        first_frame,
        last_frame,
        scale,
        data_start,
        analog_samples_per_frame,
        frame_rate,
    })
}

/// Strip the space and NUL padding C3D uses for fixed-width text.
fn clean_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Char parameters: the first dimension is the string width, the remaining
/// dimensions shape the array of strings.
fn text_value(dims: Vec<usize>, raw: &[u8]) -> ParamValue {
    if dims.is_empty() {
        return ParamValue::texts(Vec::new(), vec![clean_text(raw)]);
    }
    let width = dims[0];
    let string_dims = dims[1..].to_vec();
    // Zero-width strings carry no text.
    if width == 0 {
        return ParamValue::texts(string_dims, Vec::new());
    }
    let count = element_count(&string_dims).unwrap_or(0);
    let strings = raw.chunks(width).take(count).map(clean_text).collect();
    ParamValue::texts(string_dims, strings)
}

/// Product of parameter dimensions, `None` on overflow.
fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

fn read_value(reader: &mut WordReader) -> Result<ParamValue> {
    let kind = reader.i8()?;
    let ndims = reader.u8()?;
    let mut dims = Vec::with_capacity(ndims as usize);
    for _ in 0..ndims {
        dims.push(reader.u8()? as usize);
    }

    let element_size = match kind {
        -1 | 1 => 1,
        2 => 2,
        4 => 4,
        other => {
            return Err(GallopError::decode(format!(
                "unsupported parameter data type {other} at byte {}",
                reader.position()
            )))
        }
    };
    let count = element_count(&dims)
        .ok_or_else(|| GallopError::decode(format!("parameter dimensions {dims:?} overflow")))?;
    let size = count
        .checked_mul(element_size)
        .ok_or_else(|| GallopError::decode(format!("parameter dimensions {dims:?} overflow")))?;
    reader.ensure_remaining(size)?;

    match kind {
        -1 => {
            let raw = reader.bytes(count)?;
            Ok(text_value(dims, &raw))
        }
        1 => {
            let raw = reader.bytes(count)?;
            Ok(ParamValue::ints(dims, raw.iter().map(|&b| i64::from(b)).collect()))
        }
        2 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(i64::from(reader.i16()?));
            }
            Ok(ParamValue::ints(dims, values))
        }
        4 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(f64::from(reader.f32()?));
            }
            Ok(ParamValue::floats(dims, values))
        }
        other => Err(GallopError::decode(format!(
            "unsupported parameter data type {other} at byte {}",
            reader.position()
        ))),
    }
}

fn read_parameters(
    reader: &mut WordReader,
    section_start: u64,
) -> Result<BTreeMap<String, ParameterMap>> {
    reader.seek(section_start)?;
    let _reserved = reader.u8()?;
    let _key = reader.u8()?;
    let block_count = reader.u8()?;
    let _processor = reader.u8()?;
    let section_end =
        (section_start + u64::from(block_count.max(1)) * BLOCK_SIZE).min(reader.len());

    let mut group_names: BTreeMap<u8, String> = BTreeMap::new();
    let mut entries: Vec<(u8, String, ParamValue)> = Vec::new();

    while reader.position() + 2 <= section_end {
        let name_len = reader.i8()?;
        if name_len == 0 {
            break;
        }
        let id = reader.i8()?;
        if id == 0 {
            break;
        }
        let raw_name = reader.bytes(name_len.unsigned_abs() as usize)?;
        let name = clean_text(&raw_name).to_uppercase();
        let offset_pos = reader.position();
        let offset = reader.i16()?;

        if id < 0 {
            let desc_len = reader.u8()?;
            reader.bytes(desc_len as usize)?;
            group_names.insert(id.unsigned_abs(), name);
        } else {
            let value = read_value(reader)?;
            let desc_len = reader.u8()?;
            reader.bytes(desc_len as usize)?;
            entries.push((id.unsigned_abs(), name, value));
        }

        if offset <= 0 {
            break;
        }
        reader.seek(offset_pos + offset as u64)?;
    }

    let mut groups: BTreeMap<String, ParameterMap> = group_names
        .values()
        .map(|name| (name.clone(), ParameterMap::new()))
        .collect();
    for (id, name, value) in entries {
        match group_names.get(&id) {
            Some(group) => {
                if let Some(params) = groups.get_mut(group) {
                    params.insert(name, value);
                }
            }
            None => log::warn!("Parameter {} references unknown group id {}", name, id),
        }
    }
    Ok(groups)
}

/// Sizes and scaling resolved from header and parameters together.
#[derive(Clone, Debug)]
struct DataLayout {
    point_count: usize,
    analog_channels: usize,
    analog_samples_per_frame: usize,
    frames: usize,
    first_frame: usize,
    float_storage: bool,
    point_scale: f64,
    point_rate: f64,
    data_offset: u64,
    analog_offsets: Vec<f64>,
    analog_scales: Vec<f64>,
    analog_gen_scale: f64,
    unsigned_analog: bool,
}

impl DataLayout {
    fn resolve(
        header: &RawHeader,
        parameters: &BTreeMap<String, ParameterMap>,
        file_len: u64,
    ) -> Result<Self> {
        let empty = ParameterMap::new();
        let point = parameters.get(GROUP_POINT).unwrap_or(&empty);
        let analog = parameters.get(GROUP_ANALOG).unwrap_or(&empty);

        let point_count = point
            .get("USED")
            .and_then(ParamValue::as_usize)
            .unwrap_or(header.point_count as usize);

        let mut frames = if header.last_frame >= header.first_frame {
            (header.last_frame - header.first_frame) as usize + 1
        } else {
            0
        };
        // Header words saturate on long trials; POINT:FRAMES is stored unsigned.
        if let Some(mut declared) = point.get("FRAMES").and_then(ParamValue::as_i64) {
            if declared < 0 {
                declared += 65_536;
            }
            if (0..=65_535).contains(&declared) && declared as usize > frames {
                frames = declared as usize;
            }
        }

        let analog_samples_per_frame = header.analog_samples_per_frame as usize;
        let analog_channels = analog
            .get("USED")
            .and_then(ParamValue::as_usize)
            .unwrap_or_else(|| {
                if analog_samples_per_frame > 0 {
                    header.analog_words_per_frame as usize / analog_samples_per_frame
                } else {
                    0
                }
            });

        let point_scale = point
            .get("SCALE")
            .and_then(ParamValue::as_f64)
            .unwrap_or(f64::from(header.scale));
        let point_rate = point
            .get("RATE")
            .and_then(ParamValue::as_f64)
            .unwrap_or(f64::from(header.frame_rate));

        let data_start = point
            .get("DATA_START")
            .and_then(ParamValue::as_usize)
            .unwrap_or(header.data_start as usize);
        if data_start == 0 {
            return Err(GallopError::decode("data section start block is 0"));
        }
        let data_offset = (data_start as u64 - 1) * BLOCK_SIZE;

        let word = if point_scale < 0.0 { 4 } else { 2 };
        let needed = point_count
            .checked_mul(4 * word)
            .zip(
                analog_channels
                    .checked_mul(analog_samples_per_frame)
                    .and_then(|n| n.checked_mul(word)),
            )
            .and_then(|(points, analogs)| points.checked_add(analogs))
            .and_then(|per_frame| per_frame.checked_mul(frames))
            .ok_or_else(|| GallopError::decode("data section size overflows"))?;
        let available = file_len.saturating_sub(data_offset);
        if needed as u64 > available {
            return Err(GallopError::decode(format!(
                "{frames} frames of {point_count} markers and {analog_channels} analog channels need {needed} bytes, {available} remain after byte {data_offset}"
            )));
        }

        let mut analog_offsets = analog
            .get("OFFSET")
            .and_then(ParamValue::to_floats)
            .unwrap_or_default();
        analog_offsets.resize(analog_channels, 0.0);
        let mut analog_scales = analog
            .get("SCALE")
            .and_then(ParamValue::to_floats)
            .unwrap_or_default();
        analog_scales.resize(analog_channels, 1.0);
        let analog_gen_scale = analog
            .get("GEN_SCALE")
            .and_then(ParamValue::as_f64)
            .unwrap_or(1.0);
        let unsigned_analog = analog
            .get("FORMAT")
            .and_then(ParamValue::as_text)
            .map(|f| f.eq_ignore_ascii_case("UNSIGNED"))
            .unwrap_or(false);

        Ok(DataLayout {
            point_count,
            analog_channels,
            analog_samples_per_frame,
            frames,
            first_frame: header.first_frame.max(1) as usize,
            float_storage: point_scale < 0.0,
            point_scale,
            point_rate,
            data_offset,
            analog_offsets,
            analog_scales,
            analog_gen_scale,
            unsigned_analog,
        })
    }

    fn analog_samples(&self) -> usize {
        self.frames * self.analog_samples_per_frame
    }
}

fn read_samples(reader: &mut WordReader, layout: &DataLayout) -> Result<(Array3<f64>, Array2<f64>)> {
    reader.seek(layout.data_offset)?;
    let mut points = Array3::<f64>::zeros((4, layout.point_count, layout.frames));
    let mut analogs = Array2::<f64>::zeros((layout.analog_channels, layout.analog_samples()));
    let residual_scale = layout.point_scale.abs();

    for frame in 0..layout.frames {
        for marker in 0..layout.point_count {
            let (xyz, word) = if layout.float_storage {
                let x = f64::from(reader.f32()?);
                let y = f64::from(reader.f32()?);
                let z = f64::from(reader.f32()?);
                let word = reader.f32()? as i32;
                ([x, y, z], word)
            } else {
                let x = f64::from(reader.i16()?) * layout.point_scale;
                let y = f64::from(reader.i16()?) * layout.point_scale;
                let z = f64::from(reader.i16()?) * layout.point_scale;
                let word = i32::from(reader.i16()?);
                ([x, y, z], word)
            };

            if word < 0 {
                for axis in 0..3 {
                    points[[axis, marker, frame]] = f64::NAN;
                }
                points[[3, marker, frame]] = INVALID_RESIDUAL;
            } else {
                for (axis, value) in xyz.iter().enumerate() {
                    points[[axis, marker, frame]] = *value;
                }
                points[[3, marker, frame]] = f64::from(word & 0xff) * residual_scale;
            }
        }

        for sample in 0..layout.analog_samples_per_frame {
            let column = frame * layout.analog_samples_per_frame + sample;
            for channel in 0..layout.analog_channels {
                let raw = if layout.float_storage {
                    f64::from(reader.f32()?)
                } else if layout.unsigned_analog {
                    f64::from(reader.u16()?)
                } else {
                    f64::from(reader.i16()?)
                };
                analogs[[channel, column]] = (raw - layout.analog_offsets[channel])
                    * layout.analog_scales[channel]
                    * layout.analog_gen_scale;
            }
        }
    }

    Ok((points, analogs))
}

fn header_maps(layout: &DataLayout) -> HeaderMaps {
    let spf = layout.analog_samples_per_frame;
    let mut points = ParameterMap::new();
    points.insert(HEADER_SIZE.to_string(), ParamValue::int(layout.point_count as i64));
    points.insert(HEADER_FRAME_RATE.to_string(), ParamValue::float(layout.point_rate));
    points.insert(
        HEADER_FIRST_FRAME.to_string(),
        ParamValue::int(layout.first_frame as i64 - 1),
    );
    points.insert(
        HEADER_LAST_FRAME.to_string(),
        ParamValue::int(layout.frames as i64 - 1),
    );

    let mut analogs = ParameterMap::new();
    analogs.insert(HEADER_SIZE.to_string(), ParamValue::int(layout.analog_channels as i64));
    analogs.insert(
        HEADER_FRAME_RATE.to_string(),
        ParamValue::float(layout.point_rate * spf as f64),
    );
    analogs.insert(
        HEADER_FIRST_FRAME.to_string(),
        ParamValue::int(((layout.first_frame - 1) * spf) as i64),
    );
    analogs.insert(
        HEADER_LAST_FRAME.to_string(),
        ParamValue::int(layout.analog_samples() as i64 - 1),
    );

    HeaderMaps { points, analogs }
}

/// Decoder for the binary C3D layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct C3dDecoder;

impl CaptureDecoder for C3dDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedCapture> {
        if (bytes.len() as u64) < BLOCK_SIZE {
            return Err(GallopError::decode(format!(
                "file is {} bytes, shorter than the header block",
                bytes.len()
            )));
        }
        if bytes[1] != C3D_KEY {
            return Err(GallopError::decode(format!(
                "header key byte is 0x{:02X}, expected 0x{:02X}",
                bytes[1], C3D_KEY
            )));
        }
        let parameter_block = bytes[0];
        if parameter_block == 0 {
            return Err(GallopError::decode("parameter section block is 0"));
        }
        let section_start = (u64::from(parameter_block) - 1) * BLOCK_SIZE;
        let processor_byte = bytes
            .get(section_start as usize + 3)
            .copied()
            .ok_or_else(|| GallopError::decode("parameter section is past the end of the file"))?;
        let processor = Processor::from_code(processor_byte)?;

        let mut reader = WordReader::new(bytes, processor);
        let header = read_header(&mut reader)?;
        let parameters = read_parameters(&mut reader, section_start)?;
        let layout = DataLayout::resolve(&header, &parameters, bytes.len() as u64)?;
        log::debug!(
            "C3D {:?}: {} markers, {} analog channels x {} per frame, {} frames, {} storage",
            processor,
            layout.point_count,
            layout.analog_channels,
            layout.analog_samples_per_frame,
            layout.frames,
            if layout.float_storage { "float" } else { "integer" }
        );

        let (points, analogs) = read_samples(&mut reader, &layout)?;

        Ok(DecodedCapture {
            header: header_maps(&layout),
            parameters,
            points,
            analogs,
        })
    }
}
