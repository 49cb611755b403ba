/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#[cfg(test)]
mod page;

#[cfg(test)]
mod engine_fallback;
#[cfg(test)]
mod htmlmediaelement;
#[cfg(test)]
mod mediacontroller;
#[cfg(test)]
mod source_selection;
#[cfg(test)]
mod texttrack;
