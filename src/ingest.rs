//! Ingestion: decoder output to labeled marker and analog sets.

use crate::c3d::{
    DecodedCapture, ParamValue, ParameterMap, GROUP_ANALOG, GROUP_FORCE_PLATFORM, GROUP_POINT,
    HEADER_FIRST_FRAME, HEADER_FRAME_RATE, HEADER_LAST_FRAME,
};
use crate::error::{GallopError, Result};
use crate::types::{
    AnalogMeta, AnalogSet, Corners, MarkerAxis, MarkerMeta, MarkerSet, Vec3,
    CHANNELS_PER_PLATFORM, CORNER_COUNT, SPACE_DIM,
};
use ndarray::{s, Array3, Axis};

const KEY_LABELS: &str = "LABELS";
const KEY_RATE: &str = "RATE";
const KEY_CORNERS: &str = "CORNERS";

/// Merge parameter maps in order; later maps overwrite earlier keys.
fn merge(maps: &[&ParameterMap]) -> ParameterMap {
    let mut merged = ParameterMap::new();
    for map in maps {
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// LABELS followed by LABELS2, LABELS3, ... until one is missing.
fn collect_labels(group: &str, params: &ParameterMap) -> Result<Option<Vec<String>>> {
    let Some(first) = params.get(KEY_LABELS) else {
        return Ok(None);
    };
    let mut labels = texts(group, KEY_LABELS, first)?;
    for n in 2.. {
        let key = format!("{KEY_LABELS}{n}");
        match params.get(&key) {
            Some(value) => labels.extend(texts(group, &key, value)?),
            None => break,
        }
    }
    Ok(Some(labels))
}

fn texts(group: &str, key: &str, value: &ParamValue) -> Result<Vec<String>> {
    value
        .to_texts()
        .ok_or_else(|| GallopError::format(group, key, "expected text"))
}

fn positive_rate(group: &str, key: &str, value: &ParamValue) -> Result<f64> {
    match value.as_f64() {
        Some(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        Some(rate) => Err(GallopError::format(group, key, format!("rate must be positive, got {rate}"))),
        None => Err(GallopError::format(group, key, "expected a numeric scalar")),
    }
}

/// Header analog rate, then ANALOG:RATE. The header rate is zero when the
/// file stores no analog samples per frame.
fn analog_rate(params: &ParameterMap) -> Result<f64> {
    let mut first_err = None;
    for key in [HEADER_FRAME_RATE, KEY_RATE] {
        if let Some(value) = params.get(key) {
            match positive_rate(GROUP_ANALOG, key, value) {
                Ok(rate) => return Ok(rate),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
    }
    Err(first_err.unwrap_or_else(|| GallopError::missing(GROUP_ANALOG, KEY_RATE)))
}

fn frame_bounds(group: &str, params: &ParameterMap) -> Result<(i64, i64)> {
    let last = params
        .get(HEADER_LAST_FRAME)
        .ok_or_else(|| GallopError::missing(group, HEADER_LAST_FRAME))?
        .as_i64()
        .ok_or_else(|| GallopError::format(group, HEADER_LAST_FRAME, "expected an integer"))?;
    let first = params
        .get(HEADER_FIRST_FRAME)
        .and_then(ParamValue::as_i64)
        .unwrap_or(0);
    Ok((first, last))
}

/// Build the marker set from header point fields and the POINT group.
pub fn map_markers(capture: &DecodedCapture) -> Result<MarkerSet> {
    let point = capture.group_or_empty(GROUP_POINT);
    let parameters = merge(&[&capture.header.points, &point]);

    let rate = match (parameters.get(KEY_RATE), parameters.get(HEADER_FRAME_RATE)) {
        (Some(rate), _) => positive_rate(GROUP_POINT, KEY_RATE, rate)?,
        (None, Some(rate)) => positive_rate(GROUP_POINT, HEADER_FRAME_RATE, rate)?,
        (None, None) => return Err(GallopError::missing(GROUP_POINT, KEY_RATE)),
    };
    let (first_frame, last_frame) = frame_bounds(GROUP_POINT, &parameters)?;

    let stored = capture.points.len_of(Axis(1));
    let mut labels = match collect_labels(GROUP_POINT, &parameters)? {
        Some(labels) => labels,
        None if stored == 0 => Vec::new(),
        None => return Err(GallopError::missing(GROUP_POINT, KEY_LABELS)),
    };
    if labels.len() < stored {
        return Err(GallopError::data_shape(format!(
            "{} marker labels for {stored} stored markers",
            labels.len()
        )));
    }
    labels.truncate(stored);

    if capture.points.len_of(Axis(0)) != MarkerAxis::ALL.len() {
        return Err(GallopError::data_shape(format!(
            "point samples have {} axes, expected {}",
            capture.points.len_of(Axis(0)),
            MarkerAxis::ALL.len()
        )));
    }

    log::debug!("{} markers over {} frames at {rate} Hz", labels.len(), last_frame + 1);
    let meta = MarkerMeta {
        rate,
        first_frame,
        last_frame,
        parameters,
    };
    MarkerSet::new(capture.points.clone(), labels, meta)
}

/// Used/unused vendor channel slots and the platform count they imply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformLayout {
    pub used: Vec<usize>,
    pub unused: Vec<usize>,
    pub plate_count: usize,
}

/// Classify analog labels: blank entries are unused slots, and the used
/// slots must form whole six-channel platform blocks.
pub fn platform_layout(labels: &[String]) -> Result<PlatformLayout> {
    let (used, unused): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| !labels[i].trim().is_empty());
    if used.len() % CHANNELS_PER_PLATFORM != 0 {
        return Err(GallopError::data_shape(format!(
            "{} used analog channels is not a multiple of {CHANNELS_PER_PLATFORM}",
            used.len()
        )));
    }
    let plate_count = used.len() / CHANNELS_PER_PLATFORM;
    Ok(PlatformLayout {
        used,
        unused,
        plate_count,
    })
}

/// Corner sets from a flat column-major 3 x 4 x N parameter.
fn parse_corners(params: &ParameterMap, plate_count: usize) -> Result<Vec<Corners>> {
    if plate_count == 0 {
        return Ok(Vec::new());
    }
    let flat = params
        .get(KEY_CORNERS)
        .ok_or_else(|| GallopError::missing(GROUP_FORCE_PLATFORM, KEY_CORNERS))?
        .to_floats()
        .ok_or_else(|| GallopError::format(GROUP_FORCE_PLATFORM, KEY_CORNERS, "expected numbers"))?;

    let per_plate = SPACE_DIM * CORNER_COUNT;
    let available = flat.len() / per_plate;
    if available < plate_count {
        return Err(GallopError::data_shape(format!(
            "{available} corner sets for {plate_count} force platforms"
        )));
    }

    Ok((0..plate_count)
        .map(|plate| {
            let at = |corner: usize, axis: usize| flat[axis + SPACE_DIM * corner + per_plate * plate];
            std::array::from_fn(|corner| Vec3::new(at(corner, 0), at(corner, 1), at(corner, 2)))
        })
        .collect())
}

/// Build the analog set from header analog fields and the FORCE_PLATFORM and
/// ANALOG groups. Coordinate frames are not attached here.
pub fn map_analogs(capture: &DecodedCapture) -> Result<AnalogSet> {
    let force_platform = capture.group_or_empty(GROUP_FORCE_PLATFORM);
    let analog = capture.group_or_empty(GROUP_ANALOG);
    let parameters = merge(&[&capture.header.analogs, &force_platform, &analog]);

    let (first_frame, last_frame) = frame_bounds(GROUP_ANALOG, &parameters)?;

    let rows = capture.analogs.nrows();
    let labels = match collect_labels(GROUP_ANALOG, &parameters)? {
        Some(labels) => labels,
        None if rows == 0 => Vec::new(),
        None => return Err(GallopError::missing(GROUP_ANALOG, KEY_LABELS)),
    };
    let layout = platform_layout(&labels)?;
    let plate_count = layout.plate_count;

    let rate = match analog_rate(&parameters) {
        Ok(rate) => rate,
        Err(err) if rows == 0 && plate_count == 0 => {
            log::debug!("No analog channels, ignoring rate: {err}");
            0.0
        }
        Err(err) => return Err(err),
    };

    let needed = plate_count * CHANNELS_PER_PLATFORM;
    if rows < needed {
        return Err(GallopError::data_shape(format!(
            "{rows} analog rows stored, {plate_count} force platforms need {needed}"
        )));
    }
    let samples = capture.analogs.ncols();
    if samples as i64 != last_frame + 1 {
        return Err(GallopError::data_shape(format!(
            "{samples} analog samples stored but last_frame is {last_frame}"
        )));
    }
    if !layout.unused.is_empty() {
        log::info!("Unused analog channels: {:?}", layout.unused);
    }
    if layout.used.iter().enumerate().any(|(i, &slot)| i != slot) {
        log::warn!(
            "Used analog channels {:?} are not the leading slots; reading platform blocks from rows 0..{needed}",
            layout.used
        );
    }

    let mut data = Array3::<f64>::zeros((CHANNELS_PER_PLATFORM, plate_count, samples));
    for plate in 0..plate_count {
        let start = plate * CHANNELS_PER_PLATFORM;
        let block = capture.analogs.slice(s![start..start + CHANNELS_PER_PLATFORM, ..]);
        data.index_axis_mut(Axis(1), plate).assign(&block);
    }

    let corners = parse_corners(&parameters, plate_count)?;
    log::info!("{plate_count} force platforms, {samples} analog samples at {rate} Hz");

    let meta = AnalogMeta {
        rate,
        first_frame,
        last_frame,
        used_channels: layout.used,
        unused_channels: layout.unused,
        plate_count,
        corners,
        parameters,
    };
    AnalogSet::new(data, meta)
}
