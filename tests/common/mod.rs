//! Synthetic C3D files for integration tests.
//!
//! Writes trials with POINT, ANALOG and FORCE_PLATFORM groups in Intel, DEC
//! or MIPS encoding. A negative `point_scale` selects float storage; a
//! positive one stores every word as a 16-bit integer.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::write::GzEncoder;
use flate2::Compression;

const BLOCK: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Intel,
    Dec,
    Mips,
}

impl Encoding {
    fn code(self) -> u8 {
        match self {
            Encoding::Intel => 84,
            Encoding::Dec => 85,
            Encoding::Mips => 86,
        }
    }
}

struct Words {
    encoding: Encoding,
    buf: Vec<u8>,
}

impl Words {
    fn new(encoding: Encoding) -> Self {
        Words {
            encoding,
            buf: Vec::new(),
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn i8(&mut self, v: i8) {
        self.buf.write_i8(v).unwrap();
    }

    fn i16(&mut self, v: i16) {
        let written = match self.encoding {
            Encoding::Intel | Encoding::Dec => self.buf.write_i16::<LittleEndian>(v),
            Encoding::Mips => self.buf.write_i16::<BigEndian>(v),
        };
        written.unwrap();
    }

    fn u16(&mut self, v: u16) {
        let written = match self.encoding {
            Encoding::Intel | Encoding::Dec => self.buf.write_u16::<LittleEndian>(v),
            Encoding::Mips => self.buf.write_u16::<BigEndian>(v),
        };
        written.unwrap();
    }

    fn f32(&mut self, v: f32) {
        let written = match self.encoding {
            Encoding::Intel => self.buf.write_f32::<LittleEndian>(v),
            Encoding::Mips => self.buf.write_f32::<BigEndian>(v),
            Encoding::Dec => {
                // VAX F-float: IEEE bits of 4v with the 16-bit words swapped.
                let mut ieee = [0u8; 4];
                LittleEndian::write_f32(&mut ieee, v * 4.0);
                self.buf.write_all(&[ieee[2], ieee[3], ieee[0], ieee[1]])
            }
        };
        written.unwrap();
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    fn pad_to_block(&mut self) {
        let rem = self.buf.len() % BLOCK;
        if rem != 0 {
            self.buf.resize(self.buf.len() + BLOCK - rem, 0);
        }
    }
}

enum Data {
    Text { width: usize, values: Vec<String> },
    Int(Vec<i16>),
    Float(Vec<f32>),
}

struct Param {
    group: i8,
    name: &'static str,
    dims: Vec<u8>,
    data: Data,
}

/// Contents of one synthetic trial.
#[derive(Clone, Debug)]
pub struct SyntheticTrial {
    pub rate: f32,
    pub labels: Vec<String>,
    /// points[frame][marker] = [x, y, z, residual word], in file units
    pub points: Vec<Vec<[f32; 4]>>,
    pub samples_per_frame: usize,
    pub analog_labels: Vec<String>,
    /// analog[channel][sample], raw stored values
    pub analog: Vec<Vec<f32>>,
    /// Flat 3 x 4 x plates, column-major.
    pub corners: Vec<f32>,
    pub force_platforms: usize,
    /// POINT:SCALE. Negative selects float storage.
    pub point_scale: f32,
    /// ANALOG:SCALE per channel; missing entries write 1.
    pub analog_scale: Vec<f32>,
    /// ANALOG:OFFSET per channel; missing entries write 0.
    pub analog_offset: Vec<i16>,
    pub gen_scale: f32,
    /// Store integer analog words unsigned (ANALOG:FORMAT = UNSIGNED).
    pub unsigned: bool,
    /// Frame count written to the header when it differs from POINT:FRAMES.
    pub header_frames: Option<usize>,
}

pub fn plate_labels(plate: usize) -> Vec<String> {
    ["Fx", "Fy", "Fz", "Mx", "My", "Mz"]
        .iter()
        .map(|c| format!("{c}{plate}"))
        .collect()
}

/// Axis-aligned 500 x 400 mm plates placed side by side along X.
pub fn plate_corners(plates: usize) -> Vec<f32> {
    let mut flat = Vec::new();
    for p in 0..plates {
        let x0 = 500.0 * p as f32;
        for (x, y) in [(x0, 400.0), (x0, 0.0), (x0 + 500.0, 0.0), (x0 + 500.0, 400.0)] {
            flat.extend_from_slice(&[x, y, 0.0]);
        }
    }
    flat
}

impl SyntheticTrial {
    /// Three markers over 50 frames at 100 Hz, two force platforms plus one
    /// blank analog slot at 1000 Hz. RASI drops out at frame 10. Valid
    /// residual words carry camera bits above the low byte (0x0305).
    pub fn walking() -> Self {
        let frames = 50;
        let spf = 10;
        let labels: Vec<String> = ["LASI", "RASI", "SACR"].iter().map(|s| s.to_string()).collect();
        let points = (0..frames)
            .map(|t| {
                (0..labels.len())
                    .map(|m| {
                        if m == 1 && t == 10 {
                            [0.0, 0.0, 0.0, -1.0]
                        } else {
                            [(m * 100 + t) as f32, 10.0, 1000.0 + t as f32 * 0.5, 773.0]
                        }
                    })
                    .collect()
            })
            .collect();

        let mut analog_labels = plate_labels(1);
        analog_labels.extend(plate_labels(2));
        analog_labels.push(String::new());
        let analog = (0..analog_labels.len())
            .map(|c| (0..frames * spf).map(|s| (c * 1000 + s) as f32).collect())
            .collect();

        SyntheticTrial {
            rate: 100.0,
            labels,
            points,
            samples_per_frame: spf,
            analog_labels,
            analog,
            corners: plate_corners(2),
            force_platforms: 2,
            point_scale: -1.0,
            analog_scale: Vec::new(),
            analog_offset: Vec::new(),
            gen_scale: 1.0,
            unsigned: false,
            header_frames: None,
        }
    }

    /// One marker moving along X for `frames` frames, no analog channels.
    pub fn long_single_marker(frames: usize) -> Self {
        let points = (0..frames).map(|t| vec![[t as f32, 0.0, 0.0, 0.0]]).collect();
        SyntheticTrial {
            rate: 100.0,
            labels: vec!["HEEL".to_string()],
            points,
            samples_per_frame: 0,
            analog_labels: Vec::new(),
            analog: Vec::new(),
            corners: Vec::new(),
            force_platforms: 0,
            point_scale: -1.0,
            analog_scale: Vec::new(),
            analog_offset: Vec::new(),
            gen_scale: 1.0,
            unsigned: false,
            header_frames: None,
        }
    }

    fn float_storage(&self) -> bool {
        self.point_scale < 0.0
    }

    pub fn frames(&self) -> usize {
        self.points.len()
    }

    fn params(&self, data_start: i16) -> Vec<Param> {
        let markers = self.labels.len();
        let channels = self.analog_labels.len();
        let text = |values: &[String]| {
            let width = values.iter().map(String::len).max().unwrap_or(0).max(1);
            (width, values.to_vec())
        };
        let (point_width, point_labels) = text(&self.labels);
        let (analog_width, analog_labels) = text(&self.analog_labels);

        let mut scales = self.analog_scale.clone();
        scales.resize(channels, 1.0);
        let mut offsets = self.analog_offset.clone();
        offsets.resize(channels, 0);

        let mut params = vec![
            Param { group: 1, name: "USED", dims: vec![], data: Data::Int(vec![markers as i16]) },
            Param { group: 1, name: "FRAMES", dims: vec![], data: Data::Int(vec![self.frames() as i16]) },
            Param { group: 1, name: "SCALE", dims: vec![], data: Data::Float(vec![self.point_scale]) },
            Param { group: 1, name: "RATE", dims: vec![], data: Data::Float(vec![self.rate]) },
            Param { group: 1, name: "DATA_START", dims: vec![], data: Data::Int(vec![data_start]) },
            Param {
                group: 1,
                name: "LABELS",
                dims: vec![point_width as u8, markers as u8],
                data: Data::Text { width: point_width, values: point_labels },
            },
        ];
        if channels > 0 {
            params.extend([
                Param { group: 2, name: "USED", dims: vec![], data: Data::Int(vec![channels as i16]) },
                Param {
                    group: 2,
                    name: "LABELS",
                    dims: vec![analog_width as u8, channels as u8],
                    data: Data::Text { width: analog_width, values: analog_labels },
                },
                Param {
                    group: 2,
                    name: "RATE",
                    dims: vec![],
                    data: Data::Float(vec![self.rate * self.samples_per_frame as f32]),
                },
                Param { group: 2, name: "GEN_SCALE", dims: vec![], data: Data::Float(vec![self.gen_scale]) },
                Param { group: 2, name: "SCALE", dims: vec![channels as u8], data: Data::Float(scales) },
                Param { group: 2, name: "OFFSET", dims: vec![channels as u8], data: Data::Int(offsets) },
            ]);
        }
        if self.unsigned {
            params.push(Param {
                group: 2,
                name: "FORMAT",
                dims: vec![8],
                data: Data::Text { width: 8, values: vec!["UNSIGNED".to_string()] },
            });
        }
        params.push(Param {
            group: 3,
            name: "USED",
            dims: vec![],
            data: Data::Int(vec![self.force_platforms as i16]),
        });
        if !self.corners.is_empty() {
            params.push(Param {
                group: 3,
                name: "CORNERS",
                dims: vec![3, 4, (self.corners.len() / 12) as u8],
                data: Data::Float(self.corners.clone()),
            });
        }
        params
    }

    fn parameter_section(&self, encoding: Encoding, data_start: i16) -> Vec<u8> {
        let mut w = Words::new(encoding);
        w.u8(1);
        w.u8(0x50);
        w.u8(0); // block count, patched below
        w.u8(encoding.code());

        let mut entries: Vec<Vec<u8>> = Vec::new();
        for (id, name) in [(1i8, "POINT"), (2, "ANALOG"), (3, "FORCE_PLATFORM")] {
            let mut body = Words::new(encoding);
            body.u8(0); // empty description
            entries.push(entry(encoding, name, -id, &body.buf));
        }
        for param in self.params(data_start) {
            let mut body = Words::new(encoding);
            match &param.data {
                Data::Text { width, values } => {
                    body.i8(-1);
                    body.u8(param.dims.len() as u8);
                    param.dims.iter().for_each(|&d| body.u8(d));
                    for value in values {
                        let mut padded = value.clone().into_bytes();
                        padded.resize(*width, b' ');
                        body.bytes(&padded);
                    }
                }
                Data::Int(values) => {
                    body.i8(2);
                    body.u8(param.dims.len() as u8);
                    param.dims.iter().for_each(|&d| body.u8(d));
                    values.iter().for_each(|&v| body.i16(v));
                }
                Data::Float(values) => {
                    body.i8(4);
                    body.u8(param.dims.len() as u8);
                    param.dims.iter().for_each(|&d| body.u8(d));
                    values.iter().for_each(|&v| body.f32(v));
                }
            }
            body.u8(0);
            entries.push(entry(encoding, param.name, param.group, &body.buf));
        }

        let last = entries.len() - 1;
        for (i, mut e) in entries.into_iter().enumerate() {
            if i == last {
                // Zero offset ends the section.
                let at = 2 + e[0] as usize;
                e[at] = 0;
                e[at + 1] = 0;
            }
            w.bytes(&e);
        }
        w.pad_to_block();
        w.buf[2] = (w.buf.len() / BLOCK) as u8;
        w.buf
    }

    /// Encode the whole file.
    pub fn to_bytes(&self, encoding: Encoding) -> Vec<u8> {
        // Parameter section size does not depend on DATA_START's value.
        let sizing = self.parameter_section(encoding, 0);
        let data_start = (2 + sizing.len() / BLOCK) as i16;
        let params = self.parameter_section(encoding, data_start);

        let channels = self.analog_labels.len();
        let mut header = Words::new(encoding);
        header.u8(2);
        header.u8(0x50);
        header.u16(self.labels.len() as u16);
        header.u16((channels * self.samples_per_frame) as u16);
        header.u16(1);
        header.u16(self.header_frames.unwrap_or(self.frames()) as u16);
        header.u16(0);
        header.f32(self.point_scale);
        header.u16(data_start as u16);
        header.u16(self.samples_per_frame as u16);
        header.f32(self.rate);
        header.pad_to_block();

        let mut data = Words::new(encoding);
        for (frame, markers) in self.points.iter().enumerate() {
            for point in markers {
                if self.float_storage() {
                    point.iter().for_each(|&v| data.f32(v));
                } else {
                    for &v in &point[..3] {
                        data.i16((v / self.point_scale).round() as i16);
                    }
                    data.i16(point[3] as i16);
                }
            }
            for sample in 0..self.samples_per_frame {
                let column = frame * self.samples_per_frame + sample;
                for channel in &self.analog {
                    let raw = channel[column];
                    if self.float_storage() {
                        data.f32(raw);
                    } else if self.unsigned {
                        data.u16(raw as u16);
                    } else {
                        data.i16(raw as i16);
                    }
                }
            }
        }
        data.pad_to_block();

        let mut bytes = header.buf;
        bytes.extend(params);
        bytes.extend(data.buf);
        bytes
    }
}

/// One parameter-section entry with its offset word pointing past itself.
fn entry(encoding: Encoding, name: &str, id: i8, body: &[u8]) -> Vec<u8> {
    let mut w = Words::new(encoding);
    w.i8(name.len() as i8);
    w.i8(id);
    w.bytes(name.as_bytes());
    w.i16((2 + body.len()) as i16);
    w.bytes(body);
    w.buf
}

pub fn write_c3d(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

pub fn write_c3d_gz(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    fs::write(&path, encoder.finish().unwrap()).unwrap();
    path
}
