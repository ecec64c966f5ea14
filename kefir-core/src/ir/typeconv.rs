//! `translate_typeconv`: the type-conversion opcode-emission rules of
//! spec §4.3, grounded on `source/ast-translator/typeconv.c`.

use super::instr::{IrInstr, IrOperand, IrOpcode};
use crate::error::{KefirError, KefirResult};
use crate::pool::{TypeBundle, TypeId, TypeShape};

fn is_complex(shape: &TypeShape, bundle: &TypeBundle) -> Option<TypeId> {
    match shape {
        TypeShape::Complex(real) => Some(*real),
        _ => None,
    }
    .map(|r| bundle.unqualified(r))
}

fn float_width_opcode(shape: &TypeShape) -> Option<(&'static str, u8)> {
    match shape {
        TypeShape::Float32 => Some(("f32", 32)),
        TypeShape::Float64 => Some(("f64", 64)),
        TypeShape::LongDouble => Some(("ld", 80)),
        _ => None,
    }
}

fn int_signed_width(shape: &TypeShape) -> Option<(u32, bool)> {
    match shape {
        TypeShape::Bool => Some((1, false)),
        TypeShape::Int { width, signed } => Some((*width, *signed)),
        TypeShape::BitInt { width, signed } => Some((*width, *signed)),
        _ => None,
    }
}

/// Emit the opcode sequence converting a value of `source` type to `dest`
/// type. Returns an empty sequence when `source == dest` after qualifier
/// normalization (testable property #9: "no-op beyond the pop for void").
pub fn translate_typeconv(
    source: TypeId,
    dest: TypeId,
    bundle: &TypeBundle,
) -> KefirResult<Vec<IrInstr>> {
    let source = bundle.unqualified(source);
    let dest = bundle.unqualified(dest);
    log::trace!("translate_typeconv: {source} -> {dest}");

    if source == dest {
        return Ok(Vec::new());
    }

    let dest_shape = bundle.resolve(dest).clone();
    let source_shape = bundle.resolve(source).clone();

    // Destination void: drop the value.
    if matches!(dest_shape, TypeShape::Void) {
        return Ok(vec![IrInstr::simple(IrOpcode::Pop)]);
    }

    // Destination pointer.
    if matches!(dest_shape, TypeShape::Pointer(_)) {
        return match &source_shape {
            TypeShape::Pointer(_) => Ok(Vec::new()),
            _ if int_signed_width(&source_shape).is_some() => {
                Ok(vec![IrInstr::new(IrOpcode::PtrFromInt, IrOperand::None)])
            }
            _ => Err(KefirError::InvalidRequest(
                "pointer-to-floating conversions are not permitted".into(),
            )),
        };
    }

    // Destination bool.
    if matches!(dest_shape, TypeShape::Bool) {
        if int_signed_width(&source_shape).is_some() {
            return Ok(vec![IrInstr::simple(IrOpcode::IntToBoolCompareZero)]);
        }
        if float_width_opcode(&source_shape).is_some() {
            if matches!(source_shape, TypeShape::LongDouble) {
                return Ok(vec![
                    IrInstr::simple(IrOpcode::LongDoubleEqualsZero),
                    IrInstr::simple(IrOpcode::BoolNot),
                ]);
            }
            return Ok(vec![IrInstr::simple(IrOpcode::FloatToBoolCompareNeZero)]);
        }
        if is_complex(&source_shape, bundle).is_some() {
            return Ok(vec![IrInstr::simple(IrOpcode::ComplexTruncate1Bit)]);
        }
        if matches!(source_shape, TypeShape::Pointer(_)) {
            return Ok(vec![IrInstr::new(IrOpcode::PtrToInt, IrOperand::None), IrInstr::simple(IrOpcode::IntToBoolCompareZero)]);
        }
        return Err(KefirError::InvalidRequest(
            "unsupported source type for bool conversion".into(),
        ));
    }

    // Destination floating-point (real).
    if let Some((_, dest_width)) = float_width_opcode(&dest_shape) {
        let mut seq = Vec::new();
        let mut effective_source = source_shape.clone();
        if let Some(real) = is_complex(&source_shape, bundle) {
            seq.push(IrInstr::simple(IrOpcode::ComplexRealPart));
            effective_source = bundle.resolve(real).clone();
        }
        if let Some((src_width, signed)) = int_signed_width(&effective_source) {
            // Every integer-to-float cast first widens the origin to a
            // 64-bit value, then emits the single fused opcode
            // (`typeconv.c`'s `cast_to_floatN` recurses through
            // `kefir_ast_translate_typeconv(..., signed/unsigned_long_long())`
            // before appending `INT_TO_FLOATn`/`UINT_TO_FLOATn`).
            if src_width < 64 {
                // `cast_to_long_double`'s unsigned branch widens through
                // `signed_long_long()` rather than `unsigned_long_long()`,
                // unlike the float32/float64 paths. Reproduced verbatim per
                // the spec §9 open question on this asymmetry.
                let widen_signed = signed || dest_width == 80;
                seq.push(if widen_signed {
                    IrInstr::new(IrOpcode::SignExtend, IrOperand::U64(64))
                } else {
                    IrInstr::new(IrOpcode::ZeroExtendMask, IrOperand::U64(64))
                });
            }
            let op = match (dest_width, signed) {
                (32, true) => IrOpcode::IntToFloat32Signed,
                (32, false) => IrOpcode::IntToFloat32Unsigned,
                (64, true) => IrOpcode::IntToFloat64Signed,
                (64, false) => IrOpcode::IntToFloat64Unsigned,
                (80, true) => IrOpcode::IntToLongDoubleSigned,
                (80, false) => IrOpcode::IntToLongDoubleUnsigned,
                _ => unreachable!("float_width_opcode only returns 32/64/80"),
            };
            seq.push(IrInstr::simple(op));
            return Ok(seq);
        }
        if let Some((_, src_width)) = float_width_opcode(&effective_source) {
            let op = if src_width < dest_width {
                IrOpcode::FloatWiden
            } else if src_width > dest_width {
                IrOpcode::FloatNarrow
            } else {
                return Ok(seq);
            };
            seq.push(IrInstr::simple(op));
            return Ok(seq);
        }
        return Err(KefirError::InvalidState(
            "missing corresponding real type for floating conversion".into(),
        ));
    }

    // Destination complex.
    if let Some(dest_real) = is_complex(&dest_shape, bundle) {
        let mut seq = Vec::new();
        if let Some(source_real) = is_complex(&source_shape, bundle) {
            // Split real/imaginary, convert each, recombine.
            seq.push(IrInstr::simple(IrOpcode::ComplexSplit));
            let mut real_conv = translate_typeconv(source_real, dest_real, bundle)?;
            seq.append(&mut real_conv);
            seq.push(IrInstr::simple(IrOpcode::ComplexRecombine));
            return Ok(seq);
        }
        // Non-complex source: convert to the matching real precision, push
        // a zero imaginary part, combine.
        let mut real_conv = translate_typeconv(source, dest_real, bundle)?;
        seq.append(&mut real_conv);
        seq.push(IrInstr::simple(IrOpcode::ComplexFromReal));
        return Ok(seq);
    }

    // Destination integer.
    if let Some((dest_width, dest_signed)) = int_signed_width(&dest_shape) {
        let mut seq = Vec::new();
        let mut effective_source = source_shape.clone();
        if let Some(real) = is_complex(&source_shape, bundle) {
            seq.push(IrInstr::simple(IrOpcode::ComplexRealPart));
            effective_source = bundle.resolve(real).clone();
        }
        if float_width_opcode(&effective_source).is_some() {
            seq.push(IrInstr::simple(if dest_signed {
                IrOpcode::FloatToIntSigned
            } else {
                IrOpcode::FloatToIntUnsigned
            }));
            return Ok(seq);
        }
        if let Some((src_width, src_signed)) = int_signed_width(&effective_source) {
            // `typeconv.c`'s `cast_to_integer` switches on the *origin*'s
            // sign to pick sign-extend vs. zero-extend-and-mask when
            // widening (e.g. `SCALAR_SIGNED_CHAR` -> `SIGN_EXTEND`,
            // `SCALAR_UNSIGNED_CHAR` -> `UINT_CONST`+`AND`); narrowing is
            // `// Intentionally left blank` — a true no-op, never an
            // instruction.
            if src_width < dest_width {
                seq.push(if src_signed {
                    IrInstr::new(IrOpcode::SignExtend, IrOperand::U64(dest_width as u64))
                } else {
                    IrInstr::new(IrOpcode::ZeroExtendMask, IrOperand::U64(dest_width as u64))
                });
            }
            return Ok(seq);
        }
        return Err(KefirError::InvalidState(
            "missing corresponding integer type for narrowing conversion".into(),
        ));
    }

    Err(KefirError::InvalidRequest(format!(
        "unsupported destination type shape {dest_shape:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with(shapes: &[TypeShape]) -> (TypeBundle, Vec<TypeId>) {
        let mut bundle = TypeBundle::new();
        let ids = shapes.iter().cloned().map(|s| bundle.intern(s)).collect();
        (bundle, ids)
    }

    /// Testable property #9: identical source/dest is a true no-op.
    #[test]
    fn same_type_is_noop() {
        let (bundle, ids) = bundle_with(&[TypeShape::Int { width: 32, signed: true }]);
        let seq = translate_typeconv(ids[0], ids[0], &bundle).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn void_destination_emits_pop() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: true },
            TypeShape::Void,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq, vec![IrInstr::simple(IrOpcode::Pop)]);
    }

    /// Testable property #9: any integer to bool compares against zero.
    #[test]
    fn int_to_bool_compares_zero() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: true },
            TypeShape::Bool,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq, vec![IrInstr::simple(IrOpcode::IntToBoolCompareZero)]);
    }

    /// Scenario S2 from spec §8: `double -> _Bool` goes through
    /// `FloatToBoolCompareNeZero`, giving `0` only for `+0.0`/`-0.0`.
    #[test]
    fn float_to_bool_scenario_s2() {
        let (bundle, ids) = bundle_with(&[TypeShape::Float64, TypeShape::Bool]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq, vec![IrInstr::simple(IrOpcode::FloatToBoolCompareNeZero)]);
    }

    #[test]
    fn long_double_to_bool_uses_equals_then_not() {
        let (bundle, ids) = bundle_with(&[TypeShape::LongDouble, TypeShape::Bool]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(
            seq,
            vec![
                IrInstr::simple(IrOpcode::LongDoubleEqualsZero),
                IrInstr::simple(IrOpcode::BoolNot)
            ]
        );
    }

    /// Narrowing is always a true no-op (`typeconv.c`'s narrowing arms are
    /// all `// Intentionally left blank`) — no instruction, regardless of
    /// either side's signedness.
    #[test]
    fn narrowing_signed_int_emits_nothing() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: true },
            TypeShape::Int { width: 8, signed: true },
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn widening_unsigned_int_emits_zero_extend_mask() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 8, signed: false },
            TypeShape::Int { width: 32, signed: false },
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq[0].opcode, IrOpcode::ZeroExtendMask);
    }

    /// The widen-path opcode choice is keyed on the *origin*'s signedness,
    /// not the destination's: an unsigned source widening into a signed,
    /// wider destination must still zero-extend-and-mask.
    #[test]
    fn widening_keys_on_source_signedness_not_destination() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 8, signed: false },
            TypeShape::Int { width: 32, signed: true },
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].opcode, IrOpcode::ZeroExtendMask);
    }

    /// Int -> float must widen to 64 bits before the fused opcode whenever
    /// the origin is narrower (`cast_to_float64` recurses through
    /// `signed_long_long()`/`unsigned_long_long()` before `INT_TO_FLOAT64`).
    #[test]
    fn int_to_float64_widens_narrower_source_first() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: true },
            TypeShape::Float64,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].opcode, IrOpcode::SignExtend);
        assert_eq!(seq[1].opcode, IrOpcode::IntToFloat64Signed);
    }

    /// A 64-bit origin needs no widen step; only the fused opcode is
    /// emitted.
    #[test]
    fn int_to_float64_skips_widen_when_already_64_bit() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 64, signed: true },
            TypeShape::Float64,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq, vec![IrInstr::simple(IrOpcode::IntToFloat64Signed)]);
    }

    /// uint -> long double widens through the *signed* intermediate
    /// (`cast_to_long_double`'s unsigned branch passes `signed_long_long()`),
    /// unlike uint -> double/float which widen through the matching
    /// unsigned intermediate. Reproduced verbatim per the spec's open
    /// question on this asymmetry.
    #[test]
    fn uint_to_long_double_widens_through_signed_intermediate() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: false },
            TypeShape::LongDouble,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].opcode, IrOpcode::SignExtend);
        assert_eq!(seq[1].opcode, IrOpcode::IntToLongDoubleUnsigned);
    }

    /// uint -> double, by contrast, widens through the unsigned
    /// intermediate (`cast_to_float64`'s unsigned branch passes
    /// `unsigned_long_long()`).
    #[test]
    fn uint_to_float64_widens_through_unsigned_intermediate() {
        let (bundle, ids) = bundle_with(&[
            TypeShape::Int { width: 32, signed: false },
            TypeShape::Float64,
        ]);
        let seq = translate_typeconv(ids[0], ids[1], &bundle).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].opcode, IrOpcode::ZeroExtendMask);
        assert_eq!(seq[1].opcode, IrOpcode::IntToFloat64Unsigned);
    }

    #[test]
    fn pointer_to_floating_is_rejected() {
        let (bundle, ids) = bundle_with(&[TypeShape::Float64, TypeShape::Pointer(TypeId::new(0))]);
        // dest is pointer, source is float: should error (InvalidRequest).
        let err = translate_typeconv(ids[0], ids[1], &bundle);
        assert!(matches!(err, Err(KefirError::InvalidRequest(_))));
    }

    #[test]
    fn complex_destination_pushes_zero_imaginary_and_combines() {
        let mut bundle = TypeBundle::new();
        let f64_ty = bundle.intern(TypeShape::Float64);
        let complex_ty = bundle.intern(TypeShape::Complex(f64_ty));
        let int_ty = bundle.intern(TypeShape::Int { width: 32, signed: true });
        let seq = translate_typeconv(int_ty, complex_ty, &bundle).unwrap();
        assert_eq!(seq.last().unwrap().opcode, IrOpcode::ComplexFromReal);
    }
}
