// This file is part of sharded-ledger.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! This module deals with representing data as sequences of binary objects for
//! use in persistent hashing.

use num_bigint::BigUint;
use std::io;

/// Something that can be written to from in-memory buffers
pub trait MemWrite<T> {
    /// Write a buffer into memory.
    fn write(&mut self, buf: &[T]);
}

impl<T: Copy> MemWrite<T> for Vec<T> {
    fn write(&mut self, buf: &[T]) {
        self.extend(buf);
    }
}

impl<T, W: MemWrite<T>> MemWrite<T> for &mut W {
    fn write(&mut self, buf: &[T]) {
        W::write(self, buf);
    }
}

/// Adapts a [`MemWrite`] sink into an [`io::Write`].
pub struct IoWrite<W: MemWrite<u8>>(pub W);

impl<W: MemWrite<u8>> io::Write for IoWrite<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An object that can be represented as a sequence of hash-able chunks.
///
/// Variable-length values are written with a `u64` little-endian length prefix,
/// so that two adjacent fields can never be re-split into a colliding encoding.
pub trait BinaryHashRepr {
    /// Writes out the binary representation of this value into a writer.
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W);
    /// The size of an object's binary representation.
    fn binary_len(&self) -> usize;
    /// Writes the hash repr into a vector
    fn binary_vec(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.binary_len());
        self.binary_repr(&mut res);
        res
    }
}

impl<const N: usize> BinaryHashRepr for [u8; N] {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        writer.write(self)
    }
    fn binary_len(&self) -> usize {
        N
    }
}

impl BinaryHashRepr for [u8] {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        (self.len() as u64).binary_repr(writer);
        writer.write(self);
    }
    fn binary_len(&self) -> usize {
        8 + self.len()
    }
}

impl BinaryHashRepr for Vec<u8> {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self[..].binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        self[..].binary_len()
    }
}

impl BinaryHashRepr for str {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.as_bytes().binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        self.as_bytes().binary_len()
    }
}

impl BinaryHashRepr for BigUint {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        self.to_bytes_le().binary_repr(writer)
    }
    fn binary_len(&self) -> usize {
        8 + (self.bits() as usize).div_ceil(8).max(1)
    }
}

impl<T: BinaryHashRepr> BinaryHashRepr for Option<T> {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        match self {
            Some(value) => {
                writer.write(&[1]);
                value.binary_repr(writer);
            }
            None => writer.write(&[0]),
        }
    }
    fn binary_len(&self) -> usize {
        1 + self.as_ref().map(BinaryHashRepr::binary_len).unwrap_or(0)
    }
}

macro_rules! integer_hash_repr {
    ($($ty:ty),*) => {
        $(
            impl BinaryHashRepr for $ty {
                fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
                    writer.write(&self.to_le_bytes());
                }
                fn binary_len(&self) -> usize {
                    <$ty>::BITS as usize / 8
                }
            }
        )*
    }
}

macro_rules! tuple_repr {
    ($head:ident$(, $tail:ident)*) => {
        #[allow(unused_parens, non_snake_case)]
        impl<$head: BinaryHashRepr$(, $tail: BinaryHashRepr)*> BinaryHashRepr for ($head, $($tail),*) {
            fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
                let ($head, $($tail),*) = self;
                $head.binary_repr(writer);
                $($tail.binary_repr(writer);)*
            }
            fn binary_len(&self) -> usize {
                let ($head, $($tail),*) = self;
                $head.binary_len() $(+ $tail.binary_len())*
            }
        }
        tuple_repr!($($tail),*);
    };
    () => {
        impl BinaryHashRepr for () {
            fn binary_repr<W: MemWrite<u8>>(&self, _: &mut W) {
            }
            fn binary_len(&self) -> usize {
                0
            }
        }
    };
}

tuple_repr!(A, B, C, D, E, F);

integer_hash_repr!(u8, u16, u32, u64, u128);

impl BinaryHashRepr for bool {
    fn binary_repr<W: MemWrite<u8>>(&self, writer: &mut W) {
        writer.write(&[*self as u8]);
    }
    fn binary_len(&self) -> usize {
        1
    }
}
