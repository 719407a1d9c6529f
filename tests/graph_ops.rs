//! Integration tests for transpose, add, and conversion operators
//!
//! Graphs are built through the public builder API and evaluated through
//! the compile boundary, so these tests exercise type inference, the
//! rewrite pass (a no-op here), and the forward rules together.

mod common;

use common::*;
use sparx::prelude::*;

fn eye(rows: usize, cols: usize) -> DenseData {
    let mut data = vec![0.0f64; rows * cols];
    for i in 0..rows.min(cols) {
        data[i * cols + i] = 1.0;
    }
    DenseData::from_slice(&data, &[rows, cols]).unwrap()
}

// ---------------------------------------------------------------------------
// Transpose
// ---------------------------------------------------------------------------

#[test]
fn test_transpose_csc() {
    let mut g = Graph::new();
    let a = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F64));
    let ta = g.transpose(a).unwrap();
    assert_eq!(g.ty(ta).dtype, DType::F64);
    assert_eq!(g.ty(ta).format(), Some(SparseFormat::Csr));

    let f = compile(&g, &[a], &[ta]).unwrap();
    let sp = SparseData::from_dense(&eye(5, 3), SparseFormat::Csc).unwrap();
    let out = f.call(&[sp.into()]).unwrap();

    let t = out[0].as_sparse().unwrap();
    assert_eq!(t.shape(), [3, 5]);
    assert_eq!(t.format(), SparseFormat::Csr);
}

#[test]
fn test_transpose_csr() {
    let mut g = Graph::new();
    let a = g.input(TypeDesc::sparse(SparseFormat::Csr, DType::F64));
    let ta = g.transpose(a).unwrap();
    assert_eq!(g.ty(ta).format(), Some(SparseFormat::Csc));

    let f = compile(&g, &[a], &[ta]).unwrap();
    let sp = SparseData::from_dense(&eye(5, 3), SparseFormat::Csr).unwrap();
    let out = f.call(&[sp.into()]).unwrap();
    assert_eq!(out[0].as_sparse().unwrap().shape(), [3, 5]);
}

#[test]
fn test_transpose_involution() {
    let mut g = Graph::new();
    let a = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F64));
    let ta = g.transpose(a).unwrap();
    let taa = g.transpose(ta).unwrap();
    assert_eq!(g.ty(taa), g.ty(a));

    let f = compile(&g, &[a], &[taa]).unwrap();
    let mut rng = seeded_rng(7);
    let sp = random_sparse(&mut rng, [4, 6], 5, 10.0, SparseFormat::Csc);
    let out = f.call(&[sp.clone().into()]).unwrap();

    let back = out[0].as_sparse().unwrap();
    assert_eq!(back.format(), sp.format());
    assert_eq!(back.shape(), sp.shape());
    assert_eq!(back.indptr(), sp.indptr());
    assert_eq!(back.indices(), sp.indices());
    assert_eq!(back.values(), sp.values());
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

// Fixtures from the classic pair:
// A:           B:           A + B:
// [1, 0]       [0, 2]       [1, 2]
// [3, 0]   +   [0, 4]   =   [3, 4]
// [0, 6]       [5, 0]       [5, 6]
fn add_fixtures() -> (DenseData, DenseData) {
    let a = DenseData::from_slice(&[1.0f64, 0.0, 3.0, 0.0, 0.0, 6.0], &[3, 2]).unwrap();
    let b = DenseData::from_slice(&[0.0f64, 2.0, 0.0, 4.0, 5.0, 0.0], &[3, 2]).unwrap();
    (a, b)
}

#[test]
fn test_add_sparse_sparse() {
    for format in [SparseFormat::Csc, SparseFormat::Csr] {
        let mut g = Graph::new();
        let x = g.input(TypeDesc::sparse(format, DType::F64));
        let y = g.input(TypeDesc::sparse(format, DType::F64));
        let apb = g.add(x, y).unwrap();
        assert_eq!(g.ty(apb), TypeDesc::sparse(format, DType::F64));

        let (a, b) = add_fixtures();
        let sa = SparseData::from_dense(&a, format).unwrap();
        let sb = SparseData::from_dense(&b, format).unwrap();

        let f = compile(&g, &[x, y], &[apb]).unwrap();
        let out = f.call(&[sa.into(), sb.into()]).unwrap();

        let sum = out[0].as_sparse().unwrap();
        assert_eq!(sum.format(), format);
        assert_eq!(sum.shape(), [3, 2]);
        assert_eq!(
            sum.to_dense().to_vec::<f64>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }
}

#[test]
fn test_add_sparse_dense() {
    for format in [SparseFormat::Csc, SparseFormat::Csr] {
        let mut g = Graph::new();
        let x = g.input(TypeDesc::sparse(format, DType::F64));
        let y = g.input(TypeDesc::dense(DType::F64));
        let apb = g.add(x, y).unwrap();
        // The sparse operand densifies; the result is dense.
        assert_eq!(g.ty(apb), TypeDesc::dense(DType::F64));

        let (a, b) = add_fixtures();
        let sa = SparseData::from_dense(&a, format).unwrap();

        let f = compile(&g, &[x, y], &[apb]).unwrap();
        let out = f.call(&[sa.into(), b.into()]).unwrap();
        assert_eq!(
            out[0].as_dense().unwrap().to_vec::<f64>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }
}

#[test]
fn test_add_dense_sparse() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::dense(DType::F64));
    let y = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F64));
    let apb = g.add(x, y).unwrap();
    assert_eq!(g.ty(apb), TypeDesc::dense(DType::F64));

    let (a, b) = add_fixtures();
    let sb = SparseData::from_dense(&b, SparseFormat::Csc).unwrap();

    let f = compile(&g, &[x, y], &[apb]).unwrap();
    let out = f.call(&[a.into(), sb.into()]).unwrap();
    assert_eq!(
        out[0].as_dense().unwrap().to_vec::<f64>(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn test_add_symmetry() {
    // add(A, B) == add(B, A) elementwise for every operand-kind combination
    let (a, b) = add_fixtures();
    let sa = SparseData::from_dense(&a, SparseFormat::Csr).unwrap();
    let sb = SparseData::from_dense(&b, SparseFormat::Csr).unwrap();

    let pairs: Vec<(Value, Value)> = vec![
        (sa.clone().into(), sb.clone().into()),
        (sa.clone().into(), b.clone().into()),
        (a.clone().into(), sb.clone().into()),
        (a.clone().into(), b.clone().into()),
    ];

    for (lhs, rhs) in pairs {
        let run = |l: &Value, r: &Value| -> Vec<f64> {
            let mut g = Graph::new();
            let x = g.input(l.type_desc());
            let y = g.input(r.type_desc());
            let apb = g.add(x, y).unwrap();
            let f = compile(&g, &[x, y], &[apb]).unwrap();
            let out = f.call(&[l.clone(), r.clone()]).unwrap();
            match &out[0] {
                Value::Dense(d) => d.to_vec::<f64>(),
                Value::Sparse(s) => s.to_dense().to_vec::<f64>(),
            }
        };
        assert_eq!(run(&lhs, &rhs), run(&rhs, &lhs));
    }
}

#[test]
fn test_add_dtype_promotion() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::I32));
    let y = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F32));
    let apb = g.add(x, y).unwrap();
    assert_eq!(g.ty(apb), TypeDesc::sparse(SparseFormat::Csc, DType::F32));

    let a = SparseData::from_slices(SparseFormat::Csc, &[0, 1], &[0], &[3i32], [2, 1]).unwrap();
    let b =
        SparseData::from_slices(SparseFormat::Csc, &[0, 1], &[1], &[0.5f32], [2, 1]).unwrap();

    let f = compile(&g, &[x, y], &[apb]).unwrap();
    let out = f.call(&[a.into(), b.into()]).unwrap();
    let sum = out[0].as_sparse().unwrap();
    assert_eq!(sum.dtype(), DType::F32);
    assert_eq!(sum.to_dense().to_vec::<f32>(), vec![3.0, 0.5]);
}

#[test]
fn test_add_format_mismatch_is_construction_error() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::sparse(SparseFormat::Csc, DType::F64));
    let y = g.input(TypeDesc::sparse(SparseFormat::Csr, DType::F64));
    assert!(matches!(g.add(x, y), Err(Error::FormatMismatch { .. })));
}

#[test]
fn test_add_shape_mismatch_at_call() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::dense(DType::F64));
    let y = g.input(TypeDesc::dense(DType::F64));
    let apb = g.add(x, y).unwrap();

    let f = compile(&g, &[x, y], &[apb]).unwrap();
    let a: Value = DenseData::zeros(&[2, 2], DType::F64).into();
    let b: Value = DenseData::zeros(&[2, 3], DType::F64).into();
    assert!(matches!(
        f.call(&[a, b]),
        Err(Error::ShapeMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

#[test]
fn test_csc_from_dense() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::dense(DType::F64));
    let s = g.csc_from_dense(x).unwrap();
    assert_eq!(g.ty(s), TypeDesc::sparse(SparseFormat::Csc, DType::F64));

    let f = compile(&g, &[x], &[s]).unwrap();
    let mut rng = seeded_rng(11);
    let dense = random_sparse(&mut rng, [3, 4], 6, 10.0, SparseFormat::Csc).to_dense();
    let out = f.call(&[dense.clone().into()]).unwrap();

    let sp = out[0].as_sparse().unwrap();
    assert_eq!(sp.format(), SparseFormat::Csc);
    assert_eq!(sp.dtype(), DType::F64);
    assert_eq!(sp.to_dense(), dense);
}

#[test]
fn test_csr_from_dense() {
    let mut g = Graph::new();
    let x = g.input(TypeDesc::dense(DType::F64));
    let s = g.csr_from_dense(x).unwrap();
    assert_eq!(g.ty(s), TypeDesc::sparse(SparseFormat::Csr, DType::F64));

    let f = compile(&g, &[x], &[s]).unwrap();
    let dense = DenseData::from_slice(&[0.0f64, 1.5, 0.0, 2.5], &[2, 2]).unwrap();
    let out = f.call(&[dense.into()]).unwrap();
    let sp = out[0].as_sparse().unwrap();
    assert_eq!(sp.format(), SparseFormat::Csr);
    assert_eq!(sp.nnz(), 2);
}

#[test]
fn test_dense_sparse_roundtrip() {
    // dense_from_sparse(csc_from_dense(X)) == X, zeros and nonzeros alike
    let mut g = Graph::new();
    let x = g.input(TypeDesc::dense(DType::F64));
    let s = g.csc_from_dense(x).unwrap();
    let back = g.dense_from_sparse(s).unwrap();
    assert_eq!(g.ty(back), TypeDesc::dense(DType::F64));

    let f = compile(&g, &[x], &[back]).unwrap();
    let mut rng = seeded_rng(13);
    for trial in 0..5 {
        let dense = random_sparse(&mut rng, [4, 6], 5, 10.0, SparseFormat::Csc).to_dense();
        let out = f.call(&[dense.clone().into()]).unwrap();
        assert_eq!(
            out[0].as_dense().unwrap(),
            &dense,
            "roundtrip failed on trial {trial}"
        );
    }
}

#[test]
fn test_dense_from_sparse_sums_duplicates() {
    // Two stored entries at the same position sum on densification.
    let mut g = Graph::new();
    let s = g.input(TypeDesc::sparse(SparseFormat::Csr, DType::F64));
    let d = g.dense_from_sparse(s).unwrap();

    let sp =
        SparseData::from_slices(SparseFormat::Csr, &[0, 2], &[1, 1], &[2.0f64, 3.0], [1, 2])
            .unwrap();
    let f = compile(&g, &[s], &[d]).unwrap();
    let out = f.call(&[sp.into()]).unwrap();
    assert_eq!(out[0].as_dense().unwrap().to_vec::<f64>(), vec![0.0, 5.0]);
}

// ---------------------------------------------------------------------------
// Construction errors
// ---------------------------------------------------------------------------

fn constant_i64(g: &mut Graph, data: &[i64]) -> NodeId {
    g.constant(DenseData::from_slice(data, &[data.len()]).unwrap().into())
}

#[test]
fn test_construct_index_out_of_range() {
    // Index pointer [0, 2, 2, 5] with an index referencing row 7 on a
    // 4-row shape
    let mut g = Graph::new();
    let data = g.constant(
        DenseData::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0], &[5])
            .unwrap()
            .into(),
    );
    let indices = constant_i64(&mut g, &[0, 7, 1, 2, 3]);
    let indptr = constant_i64(&mut g, &[0, 2, 2, 5]);
    let shape = constant_i64(&mut g, &[4, 3]);
    let csc = g.csc_from_parts(data, indices, indptr, shape).unwrap();

    let f = compile(&g, &[], &[csc]).unwrap();
    assert!(matches!(f.call(&[]), Err(Error::Structure { .. })));
}

#[test]
fn test_construct_bad_indptr_length() {
    let mut g = Graph::new();
    let data = g.constant(DenseData::from_slice(&[1.0f64, 2.0], &[2]).unwrap().into());
    let indices = constant_i64(&mut g, &[0, 1]);
    let indptr = constant_i64(&mut g, &[0, 2]);
    let shape = constant_i64(&mut g, &[4, 3]);
    let csc = g.csc_from_parts(data, indices, indptr, shape).unwrap();

    let f = compile(&g, &[], &[csc]).unwrap();
    assert!(matches!(f.call(&[]), Err(Error::Structure { .. })));
}

#[test]
fn test_construct_decreasing_indptr() {
    let mut g = Graph::new();
    let data = g.constant(
        DenseData::from_slice(&[1.0f64, 2.0, 3.0], &[3])
            .unwrap()
            .into(),
    );
    let indices = constant_i64(&mut g, &[0, 1, 2]);
    let indptr = constant_i64(&mut g, &[0, 2, 1, 3]);
    let shape = constant_i64(&mut g, &[4, 3]);
    let csc = g.csc_from_parts(data, indices, indptr, shape).unwrap();

    let f = compile(&g, &[], &[csc]).unwrap();
    assert!(matches!(f.call(&[]), Err(Error::Structure { .. })));
}
