// ============================================
// Ghost Payload - Формат обмена блоками
// ============================================
// Запрос: bincode(GhostRequest) - список ячеек блоков.
// Ответ: bincode(GhostHeader) + zstd(bincode(Vec<GhostBlockData>))
//
// Узлы передаются сырыми байтами (Node: Pod), поэтому заголовок
// фиксирует раскладку блока и размер узла. Несовпадение - ошибка.

use std::mem;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::grid::block::{Block, BlockLayout, Node};
use crate::grid::coord::GridPos;

/// "BGRD" в ASCII
pub const GHOST_MAGIC: [u8; 4] = *b"BGRD";
/// Версия формата ответа
pub const GHOST_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

/// Какие блоки нужны от владельца (координаты ячеек)
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct GhostRequest {
    pub cells: Vec<GridPos>,
}

impl GhostRequest {
    pub fn encode(&self) -> GridResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GridError::Serialize(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> GridResult<Self> {
        bincode::deserialize(bytes).map_err(|e| GridError::Deserialize(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GhostHeader {
    magic: [u8; 4],
    version: u32,
    /// Шаг, на котором отправлены блоки
    timestamp: u64,
    block_size: i32,
    dilation: i32,
    /// size_of::<N>()
    node_bytes: u32,
    block_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GhostBlockData {
    base_coord: GridPos,
    nodes: Vec<u8>,
}

/// Разобранный ответ владельца
pub(crate) struct GhostReply<N> {
    pub timestamp: u64,
    pub blocks: Vec<(GridPos, Vec<N>)>,
}

/// Упаковать блоки для отправки
pub(crate) fn encode_reply<N: Node>(
    layout: &BlockLayout,
    timestamp: u64,
    blocks: &[&Block<N>],
) -> GridResult<Vec<u8>> {
    let header = GhostHeader {
        magic: GHOST_MAGIC,
        version: GHOST_VERSION,
        timestamp,
        block_size: layout.size(),
        dilation: layout.dilation(),
        node_bytes: mem::size_of::<N>() as u32,
        block_count: blocks.len() as u32,
    };
    let mut out = bincode::serialize(&header).map_err(|e| GridError::Serialize(e.to_string()))?;

    let body: Vec<GhostBlockData> = blocks
        .iter()
        .map(|b| GhostBlockData {
            base_coord: b.base_coord(),
            nodes: bytemuck::cast_slice::<N, u8>(b.nodes()).to_vec(),
        })
        .collect();
    let body_bytes = bincode::serialize(&body).map_err(|e| GridError::Serialize(e.to_string()))?;
    let compressed = zstd::encode_all(&body_bytes[..], ZSTD_LEVEL)
        .map_err(|e| GridError::Compression(e.to_string()))?;
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Распаковать ответ и проверить совместимость раскладки
pub(crate) fn decode_reply<N: Node>(bytes: &[u8], layout: &BlockLayout) -> GridResult<GhostReply<N>> {
    let mut reader = bytes;
    let header: GhostHeader =
        bincode::deserialize_from(&mut reader).map_err(|e| GridError::Deserialize(e.to_string()))?;

    if header.magic != GHOST_MAGIC {
        return Err(GridError::InvalidMagic);
    }
    if header.version != GHOST_VERSION {
        return Err(GridError::UnsupportedVersion(header.version));
    }
    let expected = (layout.size(), layout.dilation());
    let found = (header.block_size, header.dilation);
    if expected != found {
        return Err(GridError::LayoutMismatch { expected, found });
    }
    if header.node_bytes as usize != mem::size_of::<N>() {
        return Err(GridError::Deserialize(format!(
            "node size {} does not match local node size {}",
            header.node_bytes,
            mem::size_of::<N>()
        )));
    }

    let body_bytes = zstd::decode_all(reader).map_err(|e| GridError::Compression(e.to_string()))?;
    let body: Vec<GhostBlockData> =
        bincode::deserialize(&body_bytes).map_err(|e| GridError::Deserialize(e.to_string()))?;
    if body.len() != header.block_count as usize {
        return Err(GridError::Deserialize(format!(
            "header announces {} blocks, body has {}",
            header.block_count,
            body.len()
        )));
    }

    let num_nodes = layout.num_nodes();
    let mut blocks = Vec::with_capacity(body.len());
    for data in body {
        if data.nodes.len() != num_nodes * mem::size_of::<N>() {
            return Err(GridError::Deserialize(format!(
                "block {:?} carries {} bytes, expected {}",
                data.base_coord,
                data.nodes.len(),
                num_nodes * mem::size_of::<N>()
            )));
        }
        let mut nodes = vec![N::zeroed(); num_nodes];
        bytemuck::cast_slice_mut::<N, u8>(&mut nodes).copy_from_slice(&data.nodes);
        blocks.push((data.base_coord, nodes));
    }
    Ok(GhostReply { timestamp: header.timestamp, blocks })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytemuck::{Pod, Zeroable};

    use super::*;

    /// Составной узел: плотность + метка материала
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    struct Cell {
        density: f32,
        material: u32,
    }

    fn sample_block(layout: &Arc<BlockLayout>) -> Block<Cell> {
        let mut block = Block::new(GridPos::new(-8, 16, 0), layout.clone());
        for p in block.storage_region() {
            *block.node_local_mut(p) = Cell { density: p.x as f32, material: (p.y * p.z + 100) as u32 };
        }
        block
    }

    #[test]
    fn test_reply_carries_nodes_and_stamp() {
        let layout = Arc::new(BlockLayout::new(8, 1));
        let block = sample_block(&layout);
        let bytes = encode_reply(&layout, 42, &[&block]).unwrap();
        let reply: GhostReply<Cell> = decode_reply(&bytes, &layout).unwrap();
        assert_eq!(reply.timestamp, 42);
        assert_eq!(reply.blocks.len(), 1);
        assert_eq!(reply.blocks[0].0, block.base_coord());
        assert_eq!(reply.blocks[0].1.as_slice(), block.nodes());
    }

    #[test]
    fn test_empty_reply_and_request() {
        let layout = BlockLayout::new(4, 0);
        let bytes = encode_reply::<u32>(&layout, 0, &[]).unwrap();
        assert!(decode_reply::<u32>(&bytes, &layout).unwrap().blocks.is_empty());

        let request = GhostRequest { cells: vec![GridPos::new(-1, 2, 3)] };
        let decoded = GhostRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded.cells, request.cells);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let layout = BlockLayout::new(4, 0);
        let mut bytes = encode_reply::<u32>(&layout, 0, &[]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_reply::<u32>(&bytes, &layout), Err(GridError::InvalidMagic)));
    }

    #[test]
    fn test_rejects_layout_and_node_size() {
        let layout = Arc::new(BlockLayout::new(8, 1));
        let block = sample_block(&layout);
        let bytes = encode_reply(&layout, 1, &[&block]).unwrap();

        let other = BlockLayout::new(8, 0);
        match decode_reply::<Cell>(&bytes, &other) {
            Err(GridError::LayoutMismatch { expected, found }) => {
                assert_eq!(expected, (8, 0));
                assert_eq!(found, (8, 1));
            }
            _ => panic!("expected layout mismatch"),
        }
        assert!(matches!(decode_reply::<f32>(&bytes, &layout), Err(GridError::Deserialize(_))));
    }
}
