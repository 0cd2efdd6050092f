use crate::types::{Scalar, ScalarKind};

macro_rules! scalar_vector {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A homogeneous vector of scalars, stored as a typed array.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ScalarVector {
            $($variant(Vec<$ty>),)*
        }

        impl ScalarVector {
            pub fn with_capacity(kind: ScalarKind, capacity: usize) -> Self {
                match kind {
                    $(ScalarKind::$variant => ScalarVector::$variant(Vec::with_capacity(capacity)),)*
                }
            }

            pub fn kind(&self) -> ScalarKind {
                match self {
                    $(ScalarVector::$variant(_) => ScalarKind::$variant,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(ScalarVector::$variant(v) => v.len(),)*
                }
            }

            pub fn get(&self, index: usize) -> Option<Scalar> {
                match self {
                    $(ScalarVector::$variant(v) => v.get(index).map(|x| Scalar::$variant(*x)),)*
                }
            }

            /// Append a scalar. Returns `false` if its kind differs.
            pub fn push(&mut self, value: Scalar) -> bool {
                match (self, value) {
                    $((ScalarVector::$variant(v), Scalar::$variant(x)) => v.push(x),)*
                    _ => return false,
                }
                true
            }
        }

        $(
            impl From<Vec<$ty>> for ScalarVector {
                fn from(v: Vec<$ty>) -> Self {
                    ScalarVector::$variant(v)
                }
            }
        )*
    };
}

scalar_vector! {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl ScalarVector {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Collect scalars of one kind. `None` if any element has another kind.
    pub fn from_scalars(kind: ScalarKind, values: &[Scalar]) -> Option<Self> {
        let mut out = ScalarVector::with_capacity(kind, values.len());
        for value in values {
            if !out.push(*value) {
                return None;
            }
        }
        Some(out)
    }
}
