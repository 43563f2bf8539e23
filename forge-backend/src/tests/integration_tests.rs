//! End-to-end code generation tests

use forge_common::{Arch, BackendError};
use forge_ir::{
    CastKind, GlobalInit, GlobalVariable, IrBinaryOp, IrBuilder, IrCmpOp, IrType, Module, Value,
};
use pretty_assertions::assert_eq;

use crate::features::{CpuModel, Ppc64Features};
use crate::ppc64::Ppc64Backend;
use crate::{create_backend, ArchBackend};

fn module_with(builder: &mut IrBuilder, name: &str) -> Module {
    let mut module = Module::new(name);
    module.add_function(builder.finish_function().unwrap());
    module
}

fn generate(module: &Module) -> String {
    Ppc64Backend::new(CpuModel::Power9)
        .codegen_module(module)
        .unwrap()
}

/// Counting loop with a phi accumulator and an alloca-backed index:
///
/// ```text
/// entry: slot = alloca i64; store 0, slot; br cond
/// cond:  acc = phi [0, entry], [acc2, body]
///        i = load slot
///        c = i < n
///        brcond c, body, end
/// body:  i2 = load slot; i3 = i2 + 1; store i3, slot
///        acc2 = acc + i3
///        br cond
/// end:   ret acc
/// ```
fn sum_below_module() -> Module {
    let mut b = IrBuilder::new();
    b.create_function("sum_below", vec![IrType::I64], IrType::I64);
    let entry = b.create_block("entry").unwrap();
    let cond = b.create_block("cond").unwrap();
    let body = b.create_block("body").unwrap();
    let end = b.create_block("end").unwrap();

    b.switch_to_block(entry).unwrap();
    let slot = b.build_alloca(IrType::I64).unwrap();
    b.build_store(Value::Constant(0), Value::Temp(slot), IrType::I64)
        .unwrap();
    b.build_br(cond).unwrap();

    b.switch_to_block(body).unwrap();
    let i2 = b.build_load(Value::Temp(slot), IrType::I64).unwrap();
    let i3 = b
        .build_binary(IrBinaryOp::Add, Value::Temp(i2), Value::Constant(1), IrType::I64)
        .unwrap();
    b.build_store(Value::Temp(i3), Value::Temp(slot), IrType::I64)
        .unwrap();

    b.switch_to_block(cond).unwrap();
    let acc = b
        .build_phi(vec![(Value::Constant(0), entry)], IrType::I64)
        .unwrap();
    let i = b.build_load(Value::Temp(slot), IrType::I64).unwrap();
    let c = b
        .build_cmp(IrCmpOp::Slt, Value::Temp(i), Value::Param(0))
        .unwrap();
    b.build_br_cond(Value::Temp(c), body, end).unwrap();

    b.switch_to_block(body).unwrap();
    let acc2 = b
        .build_binary(IrBinaryOp::Add, Value::Temp(acc), Value::Temp(i3), IrType::I64)
        .unwrap();
    b.build_br(cond).unwrap();

    b.switch_to_block(end).unwrap();
    b.build_ret(Some(Value::Temp(acc))).unwrap();

    let mut func = b.finish_function().unwrap();
    // Wire the second phi edge now that the body value exists
    let phi_block = func.get_block_mut(cond).unwrap();
    if let forge_ir::Instruction::Phi { incoming, .. } = &mut phi_block.instructions[0] {
        incoming.push((Value::Temp(acc2), body));
    }

    let mut module = Module::new("loops");
    module.add_function(func);
    module
}

#[test]
fn test_loop_with_phi_generates_slot_traffic() {
    let module = sum_below_module();
    let asm = generate(&module);

    // All four block labels and the shared epilogue are present
    for block in 0..4 {
        assert!(asm.contains(&format!(".L_sum_below_{block}:")), "{asm}");
    }
    assert!(asm.contains(".Lepilogue_sum_below:"));

    // Frame: alloca slot (8) + phi slot (8) above the 112-byte minimum,
    // plus scratch margin, rounded to 16
    assert!(asm.contains("stdu 1,-192(1)"));
    assert_eq!(module.functions[0].stack_size.get(), 192);

    // Phi edges store into the slot at 120(r31): once from entry, once
    // from body; the phi site and the return both load it back
    assert!(asm.matches("std 11,120(31)").count() >= 2, "{asm}");
    assert!(asm.matches("ld 3,120(31)").count() >= 2, "{asm}");

    // The parameter was home-spilled and is read back for the compare
    assert!(asm.contains("std 3,240(31)"));
    assert!(asm.contains("ld 12,240(31)"));

    // Conditional branch tests the materialized condition
    assert!(asm.contains("cmpdi 0,11,0"));
    assert!(asm.contains("bne 0,.L_sum_below_2"));
    assert!(asm.contains("b .L_sum_below_3"));
}

#[test]
fn test_function_descriptor_and_frame_shape() {
    let mut b = IrBuilder::new();
    b.create_function("answer", vec![], IrType::I64);
    b.create_block("entry").unwrap();
    b.build_ret(Some(Value::Constant(42))).unwrap();
    let module = module_with(&mut b, "m");
    let asm = generate(&module);

    assert!(asm.contains(".abiversion 1"));
    assert!(asm.contains(".globl answer"));
    assert!(asm.contains(".section \".opd\",\"aw\""));
    assert!(asm.contains(".quad .L.answer,.TOC.@tocbase,0"));
    assert!(asm.contains(".type answer,@function"));
    assert!(asm.contains(".size answer,.-.L.answer"));

    // Prologue and epilogue bracket the body with matching frame size
    let size = module.functions[0].stack_size.get();
    assert_eq!(size % 16, 0);
    assert!(asm.contains(&format!("stdu 1,-{size}(1)")));
    assert!(asm.contains(&format!("addi 1,1,{size}")));
    assert!(asm.contains("mflr 0"));
    assert!(asm.contains("mtlr 0"));
    assert!(asm.contains("blr"));

    assert!(asm.contains("li 3,42"));
    assert!(asm.contains("b .Lepilogue_answer"));
}

#[test]
fn test_immediate_tiers_in_emitted_code() {
    let emit_const = |value: i64| {
        let mut b = IrBuilder::new();
        b.create_function("k", vec![], IrType::I64);
        b.create_block("entry").unwrap();
        b.build_ret(Some(Value::Constant(value))).unwrap();
        generate(&module_with(&mut b, "m"))
    };

    assert!(emit_const(7).contains("li 3,7"));

    let wide = emit_const(0x12345678);
    assert!(wide.contains("lis 3,4660"));
    assert!(wide.contains("ori 3,3,22136"));
    assert!(!wide.contains("sldi"));

    let huge = emit_const(0x1234_5678_9abc_def0);
    assert!(huge.contains("sldi 3,3,32"));
    assert!(huge.contains("oris 3,3,39612"));
}

#[test]
fn test_ninth_call_argument_goes_to_stack() {
    let mut b = IrBuilder::new();
    b.create_function("caller", vec![], IrType::I64);
    b.create_block("entry").unwrap();
    let args: Vec<Value> = (1..=9).map(Value::Constant).collect();
    b.build_call(Value::Function("wide9".into()), args, true)
        .unwrap();
    b.build_ret(Some(Value::Constant(0))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    // First eight arguments fill r3..r10
    for (i, reg) in (3..=10).enumerate() {
        assert!(asm.contains(&format!("li {reg},{}", i + 1)), "{asm}");
    }
    // The ninth lands just past the 48-byte header + 64-byte register area
    assert!(asm.contains("std 11,112(1)"));

    // Direct call sequence preserves the TOC around the branch
    assert!(asm.contains("std 2,40(1)"));
    assert!(asm.contains("bl wide9"));
    assert!(asm.contains("\tnop\n"));
    assert!(asm.contains("ld 2,40(1)"));
}

#[test]
fn test_stacked_call_args_do_not_overlap_locals() {
    let mut b = IrBuilder::new();
    b.create_function("mixed", vec![], IrType::I64);
    b.create_block("entry").unwrap();
    let slot = b.build_alloca(IrType::I64).unwrap();
    b.build_store(Value::Constant(7), Value::Temp(slot), IrType::I64)
        .unwrap();
    let args: Vec<Value> = (1..=9).map(Value::Constant).collect();
    b.build_call(Value::Function("wide9".into()), args, true)
        .unwrap();
    let kept = b.build_load(Value::Temp(slot), IrType::I64).unwrap();
    b.build_ret(Some(Value::Temp(kept))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    // The ninth argument goes out at 112(r1); the local slot was pushed
    // past it to 120 and survives the call
    assert!(asm.contains("std 11,112(1)"), "{asm}");
    assert!(asm.contains("std 12,120(31)"), "{asm}");
    assert!(asm.contains("ld 3,120(31)"), "{asm}");
    assert!(!asm.contains("112(31)"), "{asm}");
}

#[test]
fn test_indirect_call_goes_through_descriptor() {
    let mut b = IrBuilder::new();
    b.create_function("dispatch", vec![IrType::Ptr], IrType::I64);
    b.create_block("entry").unwrap();
    let target = b
        .build_cast(CastKind::IntToPtr, Value::Param(0), IrType::I64, IrType::Ptr)
        .unwrap();
    b.build_call(Value::Temp(target), vec![], true).unwrap();
    b.build_ret(Some(Value::Constant(0))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    assert!(asm.contains("ld 12,0(11)"));
    assert!(asm.contains("ld 2,8(11)"));
    assert!(asm.contains("mtctr 12"));
    assert!(asm.contains("bctrl"));
    assert!(asm.contains("ld 2,40(1)"));
}

#[test]
fn test_string_literals_are_deduplicated() {
    let mut b = IrBuilder::new();
    b.create_function("greet", vec![], IrType::Void);
    b.create_block("entry").unwrap();
    b.build_call(
        Value::Function("puts".into()),
        vec![Value::ConstantString("hello".into())],
        false,
    )
    .unwrap();
    b.build_call(
        Value::Function("puts".into()),
        vec![Value::ConstantString("hello".into())],
        false,
    )
    .unwrap();
    b.build_ret(None).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    assert_eq!(asm.matches(".string \"hello\"").count(), 1, "{asm}");
    assert_eq!(asm.matches("addis 3,2,.LC0@toc@ha").count(), 2);
    assert!(!asm.contains(".LC1"));
}

#[test]
fn test_globals_are_emitted_after_code() {
    let mut b = IrBuilder::new();
    b.create_function("noop", vec![], IrType::Void);
    b.create_block("entry").unwrap();
    b.build_ret(None).unwrap();
    let mut module = module_with(&mut b, "m");
    module.add_global(GlobalVariable {
        name: "counter".into(),
        ty: IrType::I64,
        init: GlobalInit::Scalar(5),
    });
    module.add_global(GlobalVariable {
        name: "scratchpad".into(),
        ty: IrType::Array { elem: Box::new(IrType::I8), len: 64 },
        init: GlobalInit::Zeroed,
    });
    let asm = generate(&module);

    assert!(asm.contains("counter:\n\t.quad 5"));
    assert!(asm.contains(".comm scratchpad,64,1"));
    let code_pos = asm.find(".L.noop").unwrap();
    let data_pos = asm.find(".comm").unwrap();
    assert!(code_pos < data_pos);
}

#[test]
fn test_cpu_model_switches_native_and_emulated() {
    let build = || {
        let mut b = IrBuilder::new();
        b.create_function("bits", vec![IrType::I64], IrType::I64);
        b.create_block("entry").unwrap();
        let n = b.build_popcnt(Value::Param(0)).unwrap();
        b.build_ret(Some(Value::Temp(n))).unwrap();
        module_with(&mut b, "m")
    };

    let native = Ppc64Backend::new(CpuModel::Power9)
        .codegen_module(&build())
        .unwrap();
    assert!(native.contains("popcntd 3,11"));
    assert!(!native.contains("mulld 11,11,12"));

    let emulated = Ppc64Backend::new(CpuModel::Generic)
        .codegen_module(&build())
        .unwrap();
    assert!(!emulated.contains("popcntd"));
    assert!(emulated.contains("mulld 11,11,12"));
    assert!(emulated.contains("srdi 3,11,56"));
}

#[test]
fn test_feature_override_forces_emulation() {
    let mut b = IrBuilder::new();
    b.create_function("pick", vec![IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let s = b
        .build_select(Value::Param(0), Value::Constant(1), Value::Constant(2))
        .unwrap();
    b.build_ret(Some(Value::Temp(s))).unwrap();
    let module = module_with(&mut b, "m");

    let asm = Ppc64Backend::with_features(Ppc64Features::none())
        .codegen_module(&module)
        .unwrap();
    assert!(!asm.contains("isel"));
    assert!(asm.contains("bne 0,.Lskip"));

    let asm = Ppc64Backend::with_features(Ppc64Features::all())
        .codegen_module(&module)
        .unwrap();
    assert!(asm.contains("isel 3,12,11,2"));
}

#[test]
fn test_unsupported_lowering_is_a_fatal_error() {
    let mut b = IrBuilder::new();
    b.create_function("bad", vec![IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let r = b.build_bswap(Value::Param(0), 16).unwrap();
    b.build_ret(Some(Value::Temp(r))).unwrap();
    let module = module_with(&mut b, "m");

    let err = Ppc64Backend::new(CpuModel::Power9)
        .codegen_module(&module)
        .unwrap_err();
    assert!(matches!(err, BackendError::Unsupported(_)), "{err}");
}

#[test]
fn test_narrow_float_to_int_sign_extends() {
    let narrow = |to: IrType, ext: &str| {
        let mut b = IrBuilder::new();
        b.create_function("narrow", vec![IrType::F64], to.clone());
        b.create_block("entry").unwrap();
        let r = b
            .build_cast(CastKind::FpToSi, Value::Param(0), IrType::F64, to)
            .unwrap();
        b.build_ret(Some(Value::Temp(r))).unwrap();
        let asm = generate(&module_with(&mut b, "m"));
        assert!(asm.contains("fctiwz 1,1"), "{asm}");
        assert!(asm.contains("lwa 3,28(31)"), "{asm}");
        assert!(asm.contains(ext), "{asm}");
    };
    narrow(IrType::I8, "extsb 3,3");
    narrow(IrType::I16, "extsh 3,3");
}

#[test]
fn test_float_to_non_integer_is_rejected() {
    let mut b = IrBuilder::new();
    b.create_function("bogus", vec![], IrType::Void);
    b.create_block("entry").unwrap();
    b.build_cast(
        CastKind::FpToSi,
        Value::ConstantFloat(1.5),
        IrType::F64,
        IrType::Void,
    )
    .unwrap();
    b.build_ret(None).unwrap();
    let module = module_with(&mut b, "m");

    let err = generate_err(&module);
    assert!(matches!(err, BackendError::Unsupported(_)));
}

fn generate_err(module: &Module) -> BackendError {
    Ppc64Backend::new(CpuModel::Power9)
        .codegen_module(module)
        .unwrap_err()
}

#[test]
fn test_external_functions_are_declarations_only() {
    let mut module = Module::new("m");
    module.add_function(forge_ir::Function::external(
        "memcpy",
        vec![IrType::Ptr, IrType::Ptr, IrType::I64],
        IrType::Ptr,
    ));
    let mut b = IrBuilder::new();
    b.create_function("noop", vec![], IrType::Void);
    b.create_block("entry").unwrap();
    b.build_ret(None).unwrap();
    module.add_function(b.finish_function().unwrap());

    let asm = generate(&module);
    assert!(!asm.contains(".L.memcpy"));
    assert!(asm.contains(".L.noop"));

    let err = Ppc64Backend::new(CpuModel::Power9)
        .codegen_func(module.get_function("memcpy").unwrap())
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidArgument(_)));
}

#[test]
fn test_repeated_codegen_is_identical() {
    let module = sum_below_module();
    let mut backend = Ppc64Backend::new(CpuModel::Power7);
    let first = backend.codegen_module(&module).unwrap();
    let second = backend.codegen_module(&module).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_float_arithmetic_stages_through_fprs() {
    let mut b = IrBuilder::new();
    b.create_function("fma_ish", vec![IrType::F64, IrType::F64], IrType::F64);
    b.create_block("entry").unwrap();
    let p = b
        .build_binary(IrBinaryOp::FMul, Value::Param(0), Value::Param(1), IrType::F64)
        .unwrap();
    b.build_ret(Some(Value::Temp(p))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    assert!(asm.contains("lfd 1,24(31)"));
    assert!(asm.contains("lfd 2,24(31)"));
    assert!(asm.contains("fmul 1,1,2"));
    assert!(asm.contains("stfd 1,24(31)"));
    assert!(asm.contains("ld 3,24(31)"));
}

#[test]
fn test_create_backend_registry() {
    let backend = create_backend(Arch::Ppc64, CpuModel::Power8).unwrap();
    assert_eq!(backend.arch_info().arch, Arch::Ppc64);

    for arch in [Arch::X86, Arch::X86_64, Arch::S370, Arch::Arm64] {
        let err = create_backend(arch, CpuModel::Generic).err().unwrap();
        assert_eq!(err, BackendError::NoBackend(arch.name()));
    }
}

#[test]
fn test_struct_field_access_uses_padded_offsets() {
    let st = IrType::Struct(vec![IrType::I8, IrType::I64, IrType::I32]);
    let mut b = IrBuilder::new();
    b.create_function("second", vec![IrType::Ptr], IrType::I64);
    b.create_block("entry").unwrap();
    let field = b.build_struct_gep(Value::Param(0), 1, st).unwrap();
    let value = b.build_load(Value::Temp(field), IrType::I64).unwrap();
    b.build_ret(Some(Value::Temp(value))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    // i64 field sits at offset 8 after alignment padding
    assert!(asm.contains("addi 3,11,8"), "{asm}");
}

#[test]
fn test_cast_width_pairs() {
    let emit_cast = |kind: CastKind, from: IrType, to: IrType| {
        let mut b = IrBuilder::new();
        b.create_function("cvt", vec![IrType::I64], to.clone());
        b.create_block("entry").unwrap();
        let r = b.build_cast(kind, Value::Param(0), from, to).unwrap();
        b.build_ret(Some(Value::Temp(r))).unwrap();
        generate(&module_with(&mut b, "m"))
    };

    // Truncation masks to the destination width
    assert!(emit_cast(CastKind::Trunc, IrType::I64, IrType::I8).contains("rldicl 3,11,0,56"));
    assert!(emit_cast(CastKind::Trunc, IrType::I64, IrType::I16).contains("rldicl 3,11,0,48"));
    assert!(emit_cast(CastKind::Trunc, IrType::I64, IrType::I32).contains("rldicl 3,11,0,32"));

    // Zero extension masks to the source width
    assert!(emit_cast(CastKind::Zext, IrType::I8, IrType::I64).contains("rldicl 3,11,0,56"));
    assert!(emit_cast(CastKind::Zext, IrType::I16, IrType::I64).contains("rldicl 3,11,0,48"));
    assert!(emit_cast(CastKind::Zext, IrType::I32, IrType::I64).contains("rldicl 3,11,0,32"));

    // Sign extension has a dedicated instruction per source width
    assert!(emit_cast(CastKind::Sext, IrType::I8, IrType::I64).contains("extsb 3,11"));
    assert!(emit_cast(CastKind::Sext, IrType::I16, IrType::I64).contains("extsh 3,11"));
    assert!(emit_cast(CastKind::Sext, IrType::I32, IrType::I64).contains("extsw 3,11"));

    // Bit-identical casts are plain moves
    assert!(emit_cast(CastKind::Bitcast, IrType::I64, IrType::F64).contains("mr 3,11"));
    assert!(emit_cast(CastKind::PtrToInt, IrType::Ptr, IrType::I64).contains("mr 3,11"));
    assert!(emit_cast(CastKind::IntToPtr, IrType::I64, IrType::Ptr).contains("mr 3,11"));

    // Int/float conversions round-trip through the scratch doubleword
    let to_f = emit_cast(CastKind::SiToFp, IrType::I32, IrType::F64);
    assert!(to_f.contains("extsw 11,11"));
    assert!(to_f.contains("fcfid 1,1"));
    let to_i = emit_cast(CastKind::FpToSi, IrType::F64, IrType::I64);
    assert!(to_i.contains("fctidz 1,1"));
    let to_w = emit_cast(CastKind::FpToSi, IrType::F64, IrType::I32);
    assert!(to_w.contains("fctiwz 1,1"));
    assert!(to_w.contains("lwa 3,28(31)"));
}

#[test]
fn test_gep_scales_by_element_size() {
    let mut b = IrBuilder::new();
    b.create_function("index", vec![IrType::Ptr, IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let addr = b
        .build_gep(Value::Param(0), Value::Param(1), IrType::I64)
        .unwrap();
    let value = b.build_load(Value::Temp(addr), IrType::I64).unwrap();
    b.build_ret(Some(Value::Temp(value))).unwrap();
    let asm = generate(&module_with(&mut b, "m"));

    // Power-of-two element size becomes a shift, not a multiply
    assert!(asm.contains("sldi 12,12,3"));
    assert!(!asm.contains("mulli"));
    assert!(asm.contains("add 3,11,12"));
    assert!(asm.contains("ld 3,0(11)"));
}
