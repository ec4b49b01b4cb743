/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use error::domain_error;

domain_error! {
    pub StoreError(domain = "Store", prefix = "STO") {
        ReadOnly(1, "mutating operation attempted against a read-only session."),
        SubstrateUnavailable(2, "the underlying substrate connection is unavailable."),
    }
}
