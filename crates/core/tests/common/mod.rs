#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pcode_core::engine::{
    ContextHandle, DecodeRequest, Engine, EngineError, InstructionRecord, OpRecord, RecordBatch,
    RegisterRecord, ResultHandle, ResultKind, SpaceId, SpaceRecord, TranslateFlags, VarnodeRecord,
};
use pcode_core::model::OpCode;
use pcode_core::registry::{Catalog, ContextVariable, LanguageDescriptor};

pub const LANGUAGE_ID: &str = "x86:LE:32:default";
pub const SLA: &[u8] = b"scripted-sla";

/// Opcode value the engine never defines.
pub const BOGUS_OPCODE: u32 = 45;

const CONST_ID: usize = 1;
const REGISTER_ID: usize = 2;
const UNIQUE_ID: usize = 3;
const RAM_ID: usize = 4;

fn space(id: usize) -> SpaceRecord {
    let (name, index) = match id {
        CONST_ID => ("const", 0),
        REGISTER_ID => ("register", 4),
        UNIQUE_ID => ("unique", 5),
        _ => ("ram", 3),
    };
    SpaceRecord {
        id: SpaceId(id),
        name: name.to_string(),
        index,
        address_size: 4,
        word_size: 1,
        flags: 0,
        highest: 0xffff_ffff,
        pointer_lower_bound: 0x100,
        pointer_upper_bound: 0xffff_ff00,
    }
}

fn vn(space_id: usize, offset: u64, size: i32) -> VarnodeRecord {
    VarnodeRecord { space: space(space_id), offset, size }
}

fn konst(value: u64) -> VarnodeRecord {
    vn(CONST_ID, value, 4)
}

fn reg(offset: u64) -> VarnodeRecord {
    vn(REGISTER_ID, offset, 4)
}

const REGISTERS: &[(&str, u64)] =
    &[("EAX", 0x0), ("ECX", 0x4), ("EDX", 0x8), ("EBX", 0xc), ("ESP", 0x10), ("EBP", 0x14)];
const EAX: u64 = 0x0;
const ESP: u64 = 0x10;

/// In-process engine that decodes a tiny x86 subset.
///
/// `90` NOP, `c3` RET, `50` PUSH EAX, `ff` emits an op with an undefined opcode.
/// Any other byte is undecodable.
#[derive(Default)]
pub struct ScriptedEngine {
    next_handle: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub released: Mutex<Vec<(ResultKind, ResultHandle)>>,
    pub defaults: Mutex<Vec<(String, u32)>>,
    pub register_queries: AtomicUsize,
    /// Append a second register sharing EAX's storage to the table.
    pub aliased: bool,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_aliased_register() -> Arc<Self> {
        Arc::new(Self { aliased: true, ..Self::default() })
    }

    pub fn release_count(&self) -> usize {
        self.released.lock().unwrap().len()
    }

    fn handle(&self) -> usize {
        self.next_handle.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn decode<'a>(request: &DecodeRequest<'a>) -> Option<Vec<(u64, u8)>> {
        let mut out = Vec::new();
        for (i, &byte) in request.bytes.iter().enumerate() {
            if out.len() as u32 == request.max_instructions {
                break;
            }
            if !matches!(byte, 0x90 | 0xc3 | 0x50 | 0xff) {
                if out.is_empty() {
                    return None;
                }
                break;
            }
            out.push((request.base_address + i as u64, byte));
        }
        Some(out)
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&self, sla: &[u8]) -> Result<ContextHandle, EngineError> {
        if sla.is_empty() {
            return Err(EngineError::EmptySpecification);
        }
        if sla != SLA {
            return Err(EngineError::OpenFailed { engine: "scripted" });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ContextHandle(self.handle()))
    }

    fn close(&self, _ctx: ContextHandle) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn set_variable_default(&self, _ctx: ContextHandle, name: &str, value: u32) {
        self.defaults.lock().unwrap().push((name.to_string(), value));
    }

    fn registers(&self, _ctx: ContextHandle) -> Vec<RegisterRecord> {
        let mut table: Vec<RegisterRecord> = REGISTERS
            .iter()
            .map(|&(name, offset)| RegisterRecord { name: name.to_string(), varnode: reg(offset) })
            .collect();
        if self.aliased {
            table.push(RegisterRecord { name: "EAX_ALIAS".to_string(), varnode: reg(EAX) });
        }
        table
    }

    fn register_name(
        &self,
        _ctx: ContextHandle,
        space: SpaceId,
        offset: u64,
        size: i32,
    ) -> Option<String> {
        self.register_queries.fetch_add(1, Ordering::SeqCst);
        if space != SpaceId(REGISTER_ID) {
            return None;
        }
        match size {
            4 => REGISTERS.iter().find(|(_, o)| *o == offset).map(|(n, _)| n.to_string()),
            2 if offset == EAX => Some("AX".to_string()),
            1 if offset == EAX => Some("AL".to_string()),
            _ => None,
        }
    }

    fn space_from_const(&self, _ctx: ContextHandle, offset: u64) -> Option<SpaceRecord> {
        match offset as usize {
            id @ (CONST_ID | REGISTER_ID | UNIQUE_ID | RAM_ID) => Some(space(id)),
            _ => None,
        }
    }

    fn disassemble(
        &self,
        _ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<InstructionRecord>> {
        let records = Self::decode(request)?
            .into_iter()
            .map(|(address, byte)| {
                let (mnemonic, body) = match byte {
                    0x90 => ("NOP", ""),
                    0xc3 => ("RET", ""),
                    0x50 => ("PUSH", "EAX"),
                    _ => ("BOGUS", ""),
                };
                InstructionRecord {
                    address,
                    length: 1,
                    mnemonic: mnemonic.to_string(),
                    body: body.to_string(),
                }
            })
            .collect();
        Some(RecordBatch { handle: ResultHandle(self.handle()), records })
    }

    fn translate(
        &self,
        _ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<OpRecord>> {
        let mut records = Vec::new();
        for (address, byte) in Self::decode(request)? {
            records.push(OpRecord {
                opcode: OpCode::Imark.code(),
                output: None,
                inputs: vec![vn(RAM_ID, address, 1)],
            });
            match byte {
                0x50 => {
                    records.push(OpRecord {
                        opcode: OpCode::IntSub.code(),
                        output: Some(reg(ESP)),
                        inputs: vec![reg(ESP), konst(4)],
                    });
                    records.push(OpRecord {
                        opcode: OpCode::Store.code(),
                        output: None,
                        inputs: vec![konst(RAM_ID as u64), reg(ESP), reg(EAX)],
                    });
                }
                0xc3 => {
                    records.push(OpRecord {
                        opcode: OpCode::Load.code(),
                        output: Some(vn(UNIQUE_ID, 0x100, 4)),
                        inputs: vec![konst(RAM_ID as u64), reg(ESP)],
                    });
                    records.push(OpRecord {
                        opcode: OpCode::IntAdd.code(),
                        output: Some(reg(ESP)),
                        inputs: vec![reg(ESP), konst(4)],
                    });
                    records.push(OpRecord {
                        opcode: OpCode::Return.code(),
                        output: None,
                        inputs: vec![vn(UNIQUE_ID, 0x100, 4)],
                    });
                    if request.flags.contains(TranslateFlags::BB_TERMINATING) {
                        break;
                    }
                }
                0xff => {
                    records.push(OpRecord { opcode: BOGUS_OPCODE, output: None, inputs: vec![] });
                }
                _ => {}
            }
        }
        Some(RecordBatch { handle: ResultHandle(self.handle()), records })
    }

    fn release(&self, kind: ResultKind, handle: ResultHandle) {
        self.released.lock().unwrap().push((kind, handle));
    }
}

pub fn descriptor(id: &str, defaults: &[(&str, &str)]) -> LanguageDescriptor {
    LanguageDescriptor {
        id: id.to_string(),
        description: "Intel/AMD 32-bit x86".into(),
        processor: "x86".into(),
        endian: "little".into(),
        size: "32".into(),
        variant: "default".into(),
        version: "1.0".into(),
        sla_file: "x86.sla".into(),
        processor_spec_file: "x86.pspec".into(),
        manual_index_file: None,
        context_defaults: defaults.iter().map(|(n, v)| ContextVariable::new(*n, *v)).collect(),
        tracked_defaults: vec![],
        sla: Arc::from(SLA),
    }
}

pub fn x86_catalog() -> Catalog {
    Catalog::from_descriptors([descriptor(LANGUAGE_ID, &[("addrsize", "1"), ("opsize", "0x1")])])
        .expect("catalog")
}

pub fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

/// Lay out `<root>/<arch>/data/languages/` with one ldefs, pspec and sla.
pub fn write_language(root: &Path, arch: &str, ldefs: &str, pspec_name: &str, pspec: &str, sla_name: &str) {
    let dir = root.join(arch).join("data").join("languages");
    write_file(&dir.join(format!("{arch}.ldefs")), ldefs.as_bytes());
    write_file(&dir.join(pspec_name), pspec.as_bytes());
    write_file(&dir.join(sla_name), SLA);
}

pub const X86_LDEFS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<language_definitions>
  <language processor="x86" endian="little" size="32" variant="default" version="1.1"
            slafile="x86.sla" processorspec="x86.pspec" manualindexfile="../manuals/x86.idx"
            id="x86:LE:32:default">
    <description>Intel/AMD 32-bit x86</description>
    <compiler name="gcc" spec="x86gcc.cspec" id="gcc"/>
  </language>
</language_definitions>
"#;

pub const X86_PSPEC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<processor_spec>
  <programcounter register="EIP"/>
  <context_data>
    <context_set space="ram">
      <set name="addrsize" val="1"/>
      <set name="opsize" val="1"/>
    </context_set>
    <tracked_set space="ram">
      <set name="DF" val="0"/>
    </tracked_set>
  </context_data>
</processor_spec>
"#;

pub const TOY_LDEFS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<language_definitions>
  <language processor="Toy" endian="big" size="32" variant="default" version="1.0"
            slafile="toy_be.sla" processorspec="toy.pspec" id="Toy:BE:32:default">
    <description>Toy (test) big endian</description>
  </language>
  <language processor="Toy" endian="little" size="32" variant="default" version="1.0"
            slafile="toy_be.sla" processorspec="toy.pspec" id="Toy:LE:32:default">
    <description>Toy (test) little endian</description>
  </language>
</language_definitions>
"#;

pub const TOY_PSPEC: &str = r#"<processor_spec><programcounter register="pc"/></processor_spec>"#;

pub fn write_processor_tree(root: &Path) {
    write_language(root, "x86", X86_LDEFS, "x86.pspec", X86_PSPEC, "x86.sla");
    write_language(root, "Toy", TOY_LDEFS, "toy.pspec", TOY_PSPEC, "toy_be.sla");
}
