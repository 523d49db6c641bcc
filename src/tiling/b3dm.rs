//! Batched 3D Model (b3dm) tile content.
//!
//! Layout: 28-byte header, feature table JSON, GLB payload. The batch table
//! is always empty. The feature table JSON is space-padded so the GLB starts
//! on an 8-byte boundary, and the whole file is zero-padded to a multiple of 8.

use serde::{Deserialize, Serialize};

use crate::error::{FootprintTilerError, Result};

pub const B3DM_MAGIC: [u8; 4] = *b"b3dm";
pub const B3DM_VERSION: u32 = 1;
pub const B3DM_HEADER_LEN: usize = 28;

/// Global semantics of the b3dm feature table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    #[serde(rename = "BATCH_LENGTH")]
    pub batch_length: u32,
    /// Offset added to every vertex position by the viewer.
    #[serde(rename = "RTC_CENTER", default, skip_serializing_if = "Option::is_none")]
    pub rtc_center: Option<[f64; 3]>,
}

impl FeatureTable {
    pub fn with_rtc_center(center: [f64; 3]) -> Self {
        Self {
            batch_length: 0,
            rtc_center: Some(center),
        }
    }
}

/// Parsed b3dm header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B3dmHeader {
    pub version: u32,
    pub byte_length: u32,
    pub feature_table_json_byte_length: u32,
    pub feature_table_binary_byte_length: u32,
    pub batch_table_json_byte_length: u32,
    pub batch_table_binary_byte_length: u32,
}

impl B3dmHeader {
    /// Byte offset of the embedded GLB.
    pub fn glb_offset(&self) -> usize {
        B3DM_HEADER_LEN
            + self.feature_table_json_byte_length as usize
            + self.feature_table_binary_byte_length as usize
            + self.batch_table_json_byte_length as usize
            + self.batch_table_binary_byte_length as usize
    }
}

/// Wrap a GLB in a b3dm envelope with an empty feature table.
pub fn package(glb: &[u8]) -> Result<Vec<u8>> {
    package_with_feature_table(glb, &FeatureTable::default())
}

/// Wrap a GLB in a b3dm envelope carrying `feature_table`.
pub fn package_with_feature_table(glb: &[u8], feature_table: &FeatureTable) -> Result<Vec<u8>> {
    if glb.is_empty() {
        return Err(FootprintTilerError::EmptyContent);
    }

    let mut ft_json = serde_json::to_vec(feature_table)
        .map_err(|e| FootprintTilerError::Encoding(format!("feature table: {e}")))?;
    while (B3DM_HEADER_LEN + ft_json.len()) % 8 != 0 {
        ft_json.push(b' ');
    }

    let body_len = B3DM_HEADER_LEN + ft_json.len() + glb.len();
    let total_len = body_len.next_multiple_of(8);
    let byte_length = u32::try_from(total_len)
        .map_err(|_| FootprintTilerError::Encoding(format!("tile too large: {total_len} bytes")))?;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&B3DM_MAGIC);
    out.extend_from_slice(&B3DM_VERSION.to_le_bytes());
    out.extend_from_slice(&byte_length.to_le_bytes());
    out.extend_from_slice(&(ft_json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // featureTableBinaryByteLength
    out.extend_from_slice(&0u32.to_le_bytes()); // batchTableJSONByteLength
    out.extend_from_slice(&0u32.to_le_bytes()); // batchTableBinaryByteLength
    out.extend_from_slice(&ft_json);
    out.extend_from_slice(glb);
    out.resize(total_len, 0);

    Ok(out)
}

/// Parse and sanity-check the header of a b3dm file.
pub fn read_header(bytes: &[u8]) -> Result<B3dmHeader> {
    if bytes.len() < B3DM_HEADER_LEN {
        return Err(FootprintTilerError::Encoding(format!(
            "b3dm too short: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0..4] != B3DM_MAGIC {
        return Err(FootprintTilerError::Encoding("b3dm magic mismatch".into()));
    }

    let word = |i: usize| {
        let at = 4 + i * 4;
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };
    let header = B3dmHeader {
        version: word(0),
        byte_length: word(1),
        feature_table_json_byte_length: word(2),
        feature_table_binary_byte_length: word(3),
        batch_table_json_byte_length: word(4),
        batch_table_binary_byte_length: word(5),
    };

    if header.version != B3DM_VERSION {
        return Err(FootprintTilerError::Encoding(format!(
            "unsupported b3dm version {}",
            header.version
        )));
    }
    if header.glb_offset() > header.byte_length as usize {
        return Err(FootprintTilerError::Encoding(
            "b3dm section lengths exceed byteLength".into(),
        ));
    }

    Ok(header)
}

/// Decode the feature table JSON of a b3dm file.
pub fn read_feature_table(bytes: &[u8]) -> Result<FeatureTable> {
    let header = read_header(bytes)?;
    let end = B3DM_HEADER_LEN + header.feature_table_json_byte_length as usize;
    let json = bytes
        .get(B3DM_HEADER_LEN..end)
        .ok_or_else(|| FootprintTilerError::Encoding("b3dm truncated feature table".into()))?;
    serde_json::from_slice(json)
        .map_err(|e| FootprintTilerError::Encoding(format!("feature table: {e}")))
}
