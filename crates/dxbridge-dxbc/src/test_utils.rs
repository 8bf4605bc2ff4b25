use crate::FourCC;

const DXBC_HEADER_LEN: usize = 32;

/// Assembles a `DXBC` container around `chunks`, in order.
///
/// Offsets and `total_size` are filled in; the checksum is left zeroed since the parser
/// never validates it.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let table_len = chunks.len() * 4;
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut body = Vec::new();
    for (fourcc, data) in chunks {
        offsets.push((DXBC_HEADER_LEN + table_len + body.len()) as u32);
        body.extend_from_slice(&fourcc.0);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
    }

    let total_size = (DXBC_HEADER_LEN + table_len + body.len()) as u32;
    let mut out = Vec::with_capacity(total_size as usize);
    out.extend_from_slice(&FourCC::DXBC.0);
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&total_size.to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());
    for offset in offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(&body);
    out
}

/// One element for [`build_signature_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct SignatureElementDesc<'a> {
    pub semantic_name: &'a str,
    pub semantic_index: u32,
    /// Raw `D3D_NAME` value.
    pub system_value: u32,
    pub component_type: u32,
    pub register: u32,
    pub mask: u8,
    pub read_write_mask: u8,
    pub stream: u8,
}

impl<'a> SignatureElementDesc<'a> {
    pub fn new(semantic_name: &'a str, system_value: u32, register: u32, mask: u8) -> Self {
        Self {
            semantic_name,
            semantic_index: 0,
            system_value,
            // float32
            component_type: 3,
            register,
            mask,
            read_write_mask: mask,
            stream: 0,
        }
    }
}

/// Builds a 24-byte-entry (`ISGN`/`OSGN`/`PCSG`) signature chunk payload.
pub fn build_signature_chunk(elements: &[SignatureElementDesc<'_>]) -> Vec<u8> {
    const HEADER_LEN: usize = 8;
    const ENTRY_LEN: usize = 24;

    let strings_start = HEADER_LEN + elements.len() * ENTRY_LEN;
    let mut strings = Vec::new();
    let mut out = Vec::with_capacity(strings_start);
    out.extend_from_slice(&(elements.len() as u32).to_le_bytes());
    out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());

    for e in elements {
        let name_offset = (strings_start + strings.len()) as u32;
        strings.extend_from_slice(e.semantic_name.as_bytes());
        strings.push(0);

        for dw in [
            name_offset,
            e.semantic_index,
            e.system_value,
            e.component_type,
            e.register,
        ] {
            out.extend_from_slice(&dw.to_le_bytes());
        }
        out.extend_from_slice(&[e.mask, e.read_write_mask, e.stream, 0]);
    }

    out.extend_from_slice(&strings);
    out
}

/// Token builders for hand-assembled SM4/SM5 programs.
pub mod sm4 {
    use crate::sm4::{DxbcOpcode, DxbcOperandType};

    /// Version token for shader model 5.0 of the given program type (5 = compute,
    /// 0 = pixel).
    pub fn version_token(program_type: u16) -> u32 {
        (u32::from(program_type) << 16) | 0x50
    }

    /// Prepends the version and length tokens to `body`.
    pub fn program_tokens(program_type: u16, body: &[u32]) -> Vec<u32> {
        let mut tokens = vec![version_token(program_type), (body.len() + 2) as u32];
        tokens.extend_from_slice(body);
        tokens
    }

    /// Program tokens serialized as a `SHDR`/`SHEX` chunk payload.
    pub fn program_bytes(program_type: u16, body: &[u32]) -> Vec<u8> {
        program_tokens(program_type, body)
            .iter()
            .flat_map(|dw| dw.to_le_bytes())
            .collect()
    }

    /// Opcode token for `op` followed by `operands`, with the length field filled in.
    pub fn opcode_token(op: DxbcOpcode, operands: &[Vec<u32>]) -> u32 {
        let len = 1 + operands.iter().map(Vec::len).sum::<usize>();
        op.0 | ((len as u32) << 24)
    }

    /// A full instruction: opcode token plus operand tokens.
    pub fn instruction(op: DxbcOpcode, operands: &[Vec<u32>]) -> Vec<u32> {
        let mut out = vec![opcode_token(op, operands)];
        out.extend(operands.iter().flatten());
        out
    }

    fn operand_token(ty: DxbcOperandType, index_dim: u32) -> u32 {
        // Samplers carry no components; everything else is a 4-component xyzw mask.
        let components = match ty {
            DxbcOperandType::Sampler => 0,
            _ => 2 | (0xf << 4),
        };
        components | (ty.raw() << 12) | (index_dim << 20)
    }

    /// `ty[index]` with an immediate index.
    pub fn reg1d(ty: DxbcOperandType, index: u32) -> Vec<u32> {
        vec![operand_token(ty, 1), index]
    }

    /// `ty[a][b]` with immediate indices.
    pub fn reg2d(ty: DxbcOperandType, a: u32, b: u32) -> Vec<u32> {
        vec![operand_token(ty, 2), a, b]
    }

    /// `ty[index + r#.x]`.
    pub fn reg1d_relative(ty: DxbcOperandType, index: u32, temp: u32) -> Vec<u32> {
        // Index representation 3: immediate32 + relative.
        let mut out = vec![operand_token(ty, 1) | (3 << 22), index];
        // Relative registers select a single component.
        out.push(1 | (2 << 2) | (DxbcOperandType::Temp.raw() << 12) | (1 << 20));
        out.push(temp);
        out
    }

    /// `l(value)`.
    pub fn imm32_scalar(value: u32) -> Vec<u32> {
        vec![1 | (DxbcOperandType::Imm32.raw() << 12), value]
    }
}
