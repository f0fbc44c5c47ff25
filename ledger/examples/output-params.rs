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

//! Outputs the default processor configuration as JSON, ready to be edited
//! and loaded with `ProcessorConfig::load`.

use sharded_ledger::parameters::ProcessorConfig;

fn main() -> anyhow::Result<()> {
    let config = ProcessorConfig::default();
    config.validate()?;
    println!("{}", config.to_json()?);
    Ok(())
}
