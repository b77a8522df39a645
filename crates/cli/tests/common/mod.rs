#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pcode_core::engine::{
    ContextHandle, DecodeRequest, Engine, EngineError, InstructionRecord, OpRecord, RecordBatch,
    RegisterRecord, ResultHandle, ResultKind, SpaceId, SpaceRecord, VarnodeRecord,
};
use pcode_core::model::OpCode;

pub const SLA: &[u8] = b"toy-sla";

const LDEFS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<language_definitions>
  <language processor="x86" endian="little" size="32" variant="default" version="1.1"
            slafile="x86.sla" processorspec="x86.pspec" id="x86:LE:32:default">
    <description>Intel/AMD 32-bit x86</description>
  </language>
  <language processor="x86" endian="little" size="64" variant="default" version="1.1"
            slafile="x86-64.sla" processorspec="x86.pspec" id="x86:LE:64:default">
    <description>Intel/AMD 64-bit x86</description>
  </language>
</language_definitions>
"#;

const PSPEC: &str = r#"<processor_spec>
  <context_data>
    <context_set space="ram"><set name="addrsize" val="1"/></context_set>
  </context_data>
</processor_spec>
"#;

/// `<root>/x86/data/languages/` with two languages.
pub fn write_processor_tree(root: &Path) {
    let dir = root.join("x86").join("data").join("languages");
    fs::create_dir_all(&dir).expect("create languages dir");
    fs::write(dir.join("x86.ldefs"), LDEFS).expect("write ldefs");
    fs::write(dir.join("x86.pspec"), PSPEC).expect("write pspec");
    fs::write(dir.join("x86.sla"), SLA).expect("write sla");
    fs::write(dir.join("x86-64.sla"), SLA).expect("write sla");
}

fn space(id: usize, name: &str) -> SpaceRecord {
    SpaceRecord {
        id: SpaceId(id),
        name: name.to_string(),
        index: id as u32,
        address_size: 4,
        word_size: 1,
        flags: 0,
        highest: 0xffff_ffff,
        pointer_lower_bound: 0,
        pointer_upper_bound: 0,
    }
}

fn eax() -> VarnodeRecord {
    VarnodeRecord { space: space(2, "register"), offset: 0, size: 4 }
}

/// Decodes `90` as NOP and `c3` as RET; anything else fails.
pub struct ToyEngine;

impl Engine for ToyEngine {
    fn name(&self) -> &'static str {
        "toy"
    }

    fn open(&self, sla: &[u8]) -> Result<ContextHandle, EngineError> {
        if sla.is_empty() {
            return Err(EngineError::EmptySpecification);
        }
        Ok(ContextHandle(1))
    }

    fn close(&self, _ctx: ContextHandle) {}

    fn set_variable_default(&self, _ctx: ContextHandle, _name: &str, _value: u32) {}

    fn registers(&self, _ctx: ContextHandle) -> Vec<RegisterRecord> {
        vec![RegisterRecord { name: "EAX".into(), varnode: eax() }]
    }

    fn register_name(&self, _: ContextHandle, _: SpaceId, _: u64, _: i32) -> Option<String> {
        None
    }

    fn space_from_const(&self, _ctx: ContextHandle, _offset: u64) -> Option<SpaceRecord> {
        None
    }

    fn disassemble(
        &self,
        _ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<InstructionRecord>> {
        let mut records = Vec::new();
        for (i, byte) in request.bytes.iter().enumerate() {
            let mnemonic = match byte {
                0x90 => "NOP",
                0xc3 => "RET",
                _ => return None,
            };
            records.push(InstructionRecord {
                address: request.base_address + i as u64,
                length: 1,
                mnemonic: mnemonic.into(),
                body: String::new(),
            });
        }
        Some(RecordBatch { handle: ResultHandle(1), records })
    }

    fn translate(
        &self,
        _ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<OpRecord>> {
        let mut records = Vec::new();
        for (i, byte) in request.bytes.iter().enumerate() {
            let address = request.base_address + i as u64;
            records.push(OpRecord {
                opcode: OpCode::Imark.code(),
                output: None,
                inputs: vec![VarnodeRecord { space: space(3, "ram"), offset: address, size: 1 }],
            });
            match byte {
                0x90 => {}
                0xc3 => records.push(OpRecord {
                    opcode: OpCode::Return.code(),
                    output: None,
                    inputs: vec![eax()],
                }),
                _ => return None,
            }
        }
        Some(RecordBatch { handle: ResultHandle(2), records })
    }

    fn release(&self, _kind: ResultKind, _handle: ResultHandle) {}
}
