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

use crate::error::ParseError;
use crate::interfaces::ArgumentsParser;

/// Separates the function name and the arguments in call data.
pub const ARGUMENT_SEPARATOR: u8 = b'@';

/// Parses `function@hexarg@hexarg...` call data.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallDataParser;

impl ArgumentsParser for CallDataParser {
    fn parse_call_data(&self, data: &[u8]) -> Result<(String, Vec<Vec<u8>>), ParseError> {
        if data.is_empty() {
            return Err(ParseError::EmptyCallData);
        }
        let mut tokens = data.split(|b| *b == ARGUMENT_SEPARATOR);
        let function = tokens.next().unwrap_or_default();
        if function.is_empty() {
            return Err(ParseError::MissingFunctionName);
        }
        let function =
            String::from_utf8(function.to_vec()).map_err(|_| ParseError::InvalidFunctionName)?;
        let arguments = tokens
            .enumerate()
            .map(|(index, token)| {
                hex::decode(token).map_err(|source| ParseError::InvalidHexArgument { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((function, arguments))
    }
}
