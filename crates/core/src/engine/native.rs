//! Binding to the native `libpcode` engine.
//!
//! Every record is copied into owned Rust values before the call that produced
//! it returns; no pointer into engine memory survives past that point. Strings
//! and lists the C API hands over (register lists, names, const-space lookups)
//! are freed here; decode results are freed through [`Engine::release`].

use std::ffi::{c_char, c_uint, c_ulonglong, c_void, CStr, CString};

use crate::engine::{
    ContextHandle, DecodeRequest, Engine, EngineError, InstructionRecord, OpRecord, RecordBatch,
    RegisterRecord, ResultHandle, ResultKind, SpaceId, SpaceRecord, VarnodeRecord,
};

mod ffi {
    use std::ffi::{c_char, c_uchar, c_uint, c_ulonglong, c_void};

    #[repr(C)]
    pub struct PcodeContext {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct NativeAddrSpace {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct AddrSpaceC {
        pub name: *const c_char,
        pub index: u32,
        pub address_size: u32,
        pub word_size: u32,
        pub flags: u32,
        pub highest: u64,
        pub pointer_lower_bound: u64,
        pub pointer_upper_bound: u64,
        pub n_space: *mut NativeAddrSpace,
    }

    #[repr(C)]
    pub struct VarnodeDataC {
        pub space: *mut AddrSpaceC,
        pub offset: c_ulonglong,
        pub size: i32,
    }

    #[repr(C)]
    pub struct PcodeOpC {
        pub opcode: u32,
        pub output: *mut VarnodeDataC,
        pub inputs: *mut VarnodeDataC,
        pub num_inputs: u32,
    }

    #[repr(C)]
    pub struct PcodeTranslationC {
        pub ops: *mut PcodeOpC,
        pub num_ops: u32,
    }

    #[repr(C)]
    pub struct DisassemblyInstructionC {
        pub address: u64,
        pub length: u64,
        pub mnemonic: *const c_char,
        pub body: *const c_char,
    }

    #[repr(C)]
    pub struct PcodeDisassemblyC {
        pub instructions: *mut DisassemblyInstructionC,
        pub num_instructions: u32,
    }

    #[repr(C)]
    pub struct RegisterInfoC {
        pub varnode: VarnodeDataC,
        pub name: *const c_char,
    }

    #[repr(C)]
    pub struct RegisterInfoListC {
        pub registers: *mut RegisterInfoC,
        pub count: u32,
    }

    #[link(name = "pcode")]
    extern "C" {
        pub fn pcode_context_create(sla_bytes: *mut c_uchar, sla_size: usize) -> *mut PcodeContext;
        pub fn pcode_context_free(ctx: *mut PcodeContext);
        pub fn pcode_context_set_variable_default(
            ctx: *mut PcodeContext,
            name: *const c_char,
            val: u32,
        );
        pub fn pcode_context_get_all_registers(ctx: *mut PcodeContext) -> *mut RegisterInfoListC;
        pub fn pcode_context_get_register_name(
            ctx: *mut PcodeContext,
            space: *mut NativeAddrSpace,
            offset: c_ulonglong,
            size: i32,
        ) -> *const c_char;

        pub fn pcode_disassemble(
            ctx: *mut PcodeContext,
            bytes: *const c_char,
            num_bytes: c_uint,
            address: c_ulonglong,
            max_instructions: c_uint,
        ) -> *mut PcodeDisassemblyC;
        pub fn pcode_disassembly_free(disas: *mut PcodeDisassemblyC);

        pub fn pcode_translate(
            ctx: *mut PcodeContext,
            bytes: *const c_char,
            num_bytes: c_uint,
            base_address: c_ulonglong,
            max_instructions: c_uint,
            flags: u32,
        ) -> *mut PcodeTranslationC;
        pub fn pcode_translation_free(trans: *mut PcodeTranslationC);

        pub fn pcode_varnode_get_space_from_const(offset: c_ulonglong) -> *mut AddrSpaceC;
    }

    extern "C" {
        pub fn free(ptr: *mut c_void);
    }
}

/// Engine backed by the prebuilt `libpcode` shared or static library.
#[derive(Debug, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

fn ctx_ptr(ctx: ContextHandle) -> *mut ffi::PcodeContext {
    ctx.0 as *mut ffi::PcodeContext
}

/// Copy a C string; null becomes empty.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn copy_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Build a slice over a C array, tolerating a null pointer with a zero count.
///
/// # Safety
/// When `count > 0`, `ptr` must point to `count` initialised elements.
unsafe fn c_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, count as usize)
    }
}

/// # Safety
/// `space` must point to a valid `AddrSpaceC`.
unsafe fn copy_space(space: *const ffi::AddrSpaceC) -> SpaceRecord {
    let space = &*space;
    SpaceRecord {
        id: SpaceId(space.n_space as usize),
        name: copy_str(space.name),
        index: space.index,
        address_size: space.address_size,
        word_size: space.word_size,
        flags: space.flags,
        highest: space.highest,
        pointer_lower_bound: space.pointer_lower_bound,
        pointer_upper_bound: space.pointer_upper_bound,
    }
}

/// # Safety
/// `vn.space` must point to a valid `AddrSpaceC`.
unsafe fn copy_varnode(vn: &ffi::VarnodeDataC) -> VarnodeRecord {
    VarnodeRecord { space: copy_space(vn.space), offset: vn.offset as u64, size: vn.size }
}

/// Callers reject inputs longer than `u32::MAX` before reaching the engine.
fn byte_count(request: &DecodeRequest<'_>) -> c_uint {
    debug_assert!(request.bytes.len() <= c_uint::MAX as usize);
    request.bytes.len() as c_uint
}

impl Engine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn open(&self, sla: &[u8]) -> Result<ContextHandle, EngineError> {
        if sla.is_empty() {
            return Err(EngineError::EmptySpecification);
        }
        // The C signature takes a mutable pointer; hand it a private copy.
        let mut blob = sla.to_vec();
        let ctx = unsafe { ffi::pcode_context_create(blob.as_mut_ptr(), blob.len()) };
        if ctx.is_null() {
            return Err(EngineError::OpenFailed { engine: self.name() });
        }
        Ok(ContextHandle(ctx as usize))
    }

    fn close(&self, ctx: ContextHandle) {
        unsafe { ffi::pcode_context_free(ctx_ptr(ctx)) }
    }

    fn set_variable_default(&self, ctx: ContextHandle, name: &str, value: u32) {
        let Ok(cname) = CString::new(name) else {
            log::warn!("context variable name {name:?} contains NUL; skipped");
            return;
        };
        unsafe { ffi::pcode_context_set_variable_default(ctx_ptr(ctx), cname.as_ptr(), value) }
    }

    fn registers(&self, ctx: ContextHandle) -> Vec<RegisterRecord> {
        let list = unsafe { ffi::pcode_context_get_all_registers(ctx_ptr(ctx)) };
        if list.is_null() {
            return Vec::new();
        }

        let mut out = Vec::new();
        unsafe {
            for reg in c_slice((*list).registers, (*list).count) {
                out.push(RegisterRecord { name: copy_str(reg.name), varnode: copy_varnode(&reg.varnode) });

                let space = reg.varnode.space;
                if !space.is_null() {
                    ffi::free((*space).name as *mut c_void);
                    ffi::free(space as *mut c_void);
                }
                ffi::free(reg.name as *mut c_void);
            }
            ffi::free((*list).registers as *mut c_void);
            ffi::free(list as *mut c_void);
        }
        out
    }

    fn register_name(
        &self,
        ctx: ContextHandle,
        space: SpaceId,
        offset: u64,
        size: i32,
    ) -> Option<String> {
        let name = unsafe {
            ffi::pcode_context_get_register_name(
                ctx_ptr(ctx),
                space.0 as *mut ffi::NativeAddrSpace,
                offset as c_ulonglong,
                size,
            )
        };
        if name.is_null() {
            return None;
        }
        let owned = unsafe { copy_str(name) };
        unsafe { ffi::free(name as *mut c_void) };
        if owned.is_empty() {
            None
        } else {
            Some(owned)
        }
    }

    fn space_from_const(&self, _ctx: ContextHandle, offset: u64) -> Option<SpaceRecord> {
        let space = unsafe { ffi::pcode_varnode_get_space_from_const(offset as c_ulonglong) };
        if space.is_null() {
            return None;
        }
        unsafe {
            let record = copy_space(space);
            ffi::free((*space).name as *mut c_void);
            ffi::free(space as *mut c_void);
            Some(record)
        }
    }

    fn disassemble(
        &self,
        ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<InstructionRecord>> {
        let disas = unsafe {
            ffi::pcode_disassemble(
                ctx_ptr(ctx),
                request.bytes.as_ptr() as *const c_char,
                byte_count(request),
                request.base_address as c_ulonglong,
                request.max_instructions as c_uint,
            )
        };
        if disas.is_null() {
            return None;
        }

        let records = unsafe {
            c_slice((*disas).instructions, (*disas).num_instructions)
                .iter()
                .map(|insn| InstructionRecord {
                    address: insn.address,
                    length: insn.length,
                    mnemonic: copy_str(insn.mnemonic),
                    body: copy_str(insn.body),
                })
                .collect()
        };
        Some(RecordBatch { handle: ResultHandle(disas as usize), records })
    }

    fn translate(
        &self,
        ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<OpRecord>> {
        let trans = unsafe {
            ffi::pcode_translate(
                ctx_ptr(ctx),
                request.bytes.as_ptr() as *const c_char,
                byte_count(request),
                request.base_address as c_ulonglong,
                request.max_instructions as c_uint,
                request.flags.bits(),
            )
        };
        if trans.is_null() {
            return None;
        }

        let records = unsafe {
            c_slice((*trans).ops, (*trans).num_ops)
                .iter()
                .map(|op| OpRecord {
                    opcode: op.opcode,
                    output: if op.output.is_null() { None } else { Some(copy_varnode(&*op.output)) },
                    inputs: c_slice(op.inputs, op.num_inputs).iter().map(|vn| copy_varnode(vn)).collect(),
                })
                .collect()
        };
        Some(RecordBatch { handle: ResultHandle(trans as usize), records })
    }

    fn release(&self, kind: ResultKind, handle: ResultHandle) {
        match kind {
            ResultKind::Disassembly => unsafe {
                ffi::pcode_disassembly_free(handle.0 as *mut ffi::PcodeDisassemblyC)
            },
            ResultKind::Translation => unsafe {
                ffi::pcode_translation_free(handle.0 as *mut ffi::PcodeTranslationC)
            },
        }
    }
}
